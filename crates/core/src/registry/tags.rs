//! Tag listing with bearer authentication and `Link` pagination

use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use super::auth::{exchange_token, BearerChallenge};
use super::client::{HttpClient, HttpResponse, ReqwestClient};
use crate::config::RegistryConfig;
use crate::errors::{RegistryError, Result};

/// Body of `GET /v2/<image>/tags/list`
#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Registry client for listing image tags
#[derive(Debug, Clone)]
pub struct RegistryClient<C: HttpClient> {
    client: C,
    base_url: String,
}

impl RegistryClient<ReqwestClient> {
    /// Client backed by reqwest, honouring the configured timeout
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let client =
            ReqwestClient::with_timeout(config.timeout()).map_err(|e| RegistryError::Client {
                message: e.to_string(),
            })?;
        Ok(Self::new(client, config))
    }
}

impl<C: HttpClient> RegistryClient<C> {
    pub fn new(client: C, config: &RegistryConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the first tag-list page for `image` (`namespace/name`)
    pub fn tags_url(&self, image: &str) -> String {
        format!("{}/v2/{}/tags/list", self.base_url, image)
    }

    /// Fetch the complete tag list of `image`
    ///
    /// Follows `rel="next"` links until none is left. A token obtained from a
    /// bearer challenge is reused for the following pages. A first page
    /// answered with 404, or with 401 even after the token exchange, means the
    /// image is not published and yields no tags. Every other non-success
    /// status, on any page, aborts the listing.
    #[instrument(level = "info", skip(self))]
    pub async fn list_tags(&self, image: &str) -> Result<Vec<String>> {
        let mut all_tags: Vec<String> = Vec::new();
        let mut token: Option<String> = None;
        let mut current_url = self.tags_url(image);
        let mut page_count = 0usize;

        loop {
            let mut response = self.fetch(&current_url, token.as_deref()).await?;

            if response.status == 401 {
                let header = response.header("www-authenticate").ok_or_else(|| {
                    RegistryError::Authentication {
                        message: format!(
                            "Registry returned 401 without WWW-Authenticate header for {}",
                            current_url
                        ),
                    }
                })?;
                debug!("Got 401 with challenge, attempting token exchange");
                let challenge = BearerChallenge::parse(header)?;
                let new_token = exchange_token(&self.client, &challenge).await?;
                response = self.fetch(&current_url, Some(&new_token)).await?;
                token = Some(new_token);
            }

            if !response.is_success() {
                if page_count == 0 && matches!(response.status, 401 | 404) {
                    warn!(
                        status = response.status,
                        url = %current_url,
                        "Image not found in registry, treating it as unpublished"
                    );
                    break;
                }
                return Err(RegistryError::Http {
                    status: response.status,
                    url: current_url,
                }
                .into());
            }

            let tag_list: TagList =
                serde_json::from_slice(&response.body).map_err(|e| RegistryError::Parsing {
                    url: current_url.clone(),
                    message: format!("Failed to parse tags list: {}", e),
                })?;
            all_tags.extend(tag_list.tags.unwrap_or_default());
            page_count += 1;

            match parse_next_link(&response.headers) {
                Some(next) => {
                    let next_url = self.resolve_link(&next);
                    debug!(
                        "Found next page link (page {}), fetching: {}",
                        page_count, next_url
                    );
                    current_url = next_url;
                }
                None => {
                    debug!(
                        "No more pages available (pagination ended at page {})",
                        page_count
                    );
                    break;
                }
            }
        }

        debug!("Fetched {} tags for {}", all_tags.len(), image);
        Ok(all_tags)
    }

    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(token) = token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }

        self.client
            .get(url, headers)
            .await
            .map_err(|e| {
                RegistryError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
                .into()
            })
    }

    /// Absolute links are used as-is; paths are joined onto the base URL
    fn resolve_link(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            format!("{}{}", self.base_url, link)
        } else {
            format!("{}/{}", self.base_url, link)
        }
    }
}

/// Parse the Link header to extract the next URL for pagination
///
/// Link headers look like: `</v2/library/nginx/tags/list?last=1.25&n=100>; rel="next"`
pub fn parse_next_link(headers: &HashMap<String, String>) -> Option<String> {
    let link_header = headers.get("link").or_else(|| headers.get("Link"))?;

    for link_part in link_header.split(',') {
        let link_part = link_part.trim();
        if link_part.contains("rel=\"next\"") {
            if let (Some(start), Some(end)) = (link_part.find('<'), link_part.find('>')) {
                if start < end {
                    return Some(link_part[start + 1..end].to_string());
                }
            }
        }
    }

    None
}
