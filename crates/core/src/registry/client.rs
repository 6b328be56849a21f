//! HTTP client implementations for registry communication

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Boxed transport error returned by [`HttpClient`] implementations
pub type HttpError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP response with status, headers and body
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Response with a status and body and no headers
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header (name is lower-cased)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client trait for registry operations
///
/// Implementations return every HTTP status as a response; only transport
/// failures (connect, timeout, TLS) are errors. Status handling is up to the
/// caller.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// GET with custom headers, returning the full response
    async fn get(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> std::result::Result<HttpResponse, HttpError>;
}

/// Default HTTP client implementation using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default configuration (no timeout)
    pub fn new() -> std::result::Result<Self, HttpError> {
        Self::with_timeout(None)
    }

    /// Create a new ReqwestClient with custom timeout configuration
    ///
    /// # Examples
    /// ```
    /// use tagwarden_core::registry::ReqwestClient;
    /// use std::time::Duration;
    ///
    /// let client = ReqwestClient::with_timeout(Some(Duration::from_secs(15)));
    /// assert!(client.is_ok());
    /// ```
    pub fn with_timeout(timeout: Option<Duration>) -> std::result::Result<Self, HttpError> {
        let mut client_builder =
            reqwest::Client::builder().user_agent(concat!("tagwarden/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout_duration) = timeout {
            client_builder = client_builder.timeout(timeout_duration);
            debug!(
                "Configured HTTP client with timeout: {:?}",
                timeout_duration
            );
        }

        let client = client_builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> std::result::Result<HttpResponse, HttpError> {
        let mut request = self.client.get(url);
        for (key, value) in &headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                format!("Request timeout for URL: {}. Check network connectivity.", url)
            } else if e.is_connect() {
                format!(
                    "Connection failed for URL: {}. Check if the host is reachable.",
                    url
                )
            } else if e.is_request() {
                format!("Request error for URL: {}: {}", url, e)
            } else {
                format!("Network error for URL: {}: {}", url, e)
            }
        })?;

        let status = response.status().as_u16();

        let mut response_headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                response_headers.insert(key.as_str().to_ascii_lowercase(), value_str.to_string());
            }
        }

        let body = response.bytes().await?;
        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

/// A request observed by [`MockHttpClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("Authorization").map(String::as_str)
    }
}

/// Mock HTTP client for testing
///
/// Responses are keyed by exact URL. A response registered with
/// [`MockHttpClient::add_authorized_response`] is returned only when the
/// request carries the matching bearer token; otherwise the plain response
/// for that URL is used.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
    authorized: Arc<Mutex<HashMap<(String, String), HttpResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_response(&self, url: impl Into<String>, response: HttpResponse) {
        let mut responses = self.responses.lock().await;
        responses.insert(url.into(), response);
    }

    pub async fn add_authorized_response(
        &self,
        url: impl Into<String>,
        token: impl Into<String>,
        response: HttpResponse,
    ) {
        let mut authorized = self.authorized.lock().await;
        authorized.insert((url.into(), format!("Bearer {}", token.into())), response);
    }

    /// All requests made so far, in order
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl HttpClient for MockHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> std::result::Result<HttpResponse, HttpError> {
        let authorization = headers.get("Authorization").cloned();
        self.requests.lock().await.push(RecordedRequest {
            url: url.to_string(),
            headers,
        });

        if let Some(authorization) = authorization {
            let authorized = self.authorized.lock().await;
            if let Some(response) = authorized.get(&(url.to_string(), authorization)) {
                return Ok(response.clone());
            }
        }

        let responses = self.responses.lock().await;
        responses
            .get(url)
            .cloned()
            .ok_or_else(|| format!("No mock response for URL: {}", url).into())
    }
}
