//! Bearer token challenge handling
//!
//! Registries answer anonymous requests with `401` and a header such as
//! `WWW-Authenticate: Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull"`.
//! The client requests a token from `realm` and retries with it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use super::client::HttpClient;
use crate::errors::{RegistryError, Result};

static CHALLENGE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z_]+)="([^"]*)""#).expect("Valid regex pattern"));

/// Parameters of a `Bearer` authentication challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

impl BearerChallenge {
    /// Parse a `WWW-Authenticate` header value
    ///
    /// Returns an authentication error when the scheme is not `Bearer` or the
    /// realm is missing. Quoted values may contain commas (multi-action
    /// scopes such as `repository:x:pull,push`).
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        let params = match header.get(..7) {
            Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => &header[7..],
            _ => {
                return Err(RegistryError::Authentication {
                    message: format!("Unsupported authentication challenge: {}", header),
                }
                .into())
            }
        };

        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        for capture in CHALLENGE_PARAM.captures_iter(params) {
            let value = capture[2].to_string();
            match &capture[1] {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        let realm = realm
            .filter(|r| !r.is_empty())
            .ok_or_else(|| RegistryError::Authentication {
                message: "Missing realm in WWW-Authenticate header".to_string(),
            })?;

        Ok(Self {
            realm,
            service,
            scope,
        })
    }

    /// Token endpoint URL with `service` and `scope` query parameters
    pub fn token_url(&self) -> Result<String> {
        let mut params = Vec::new();
        if let Some(service) = &self.service {
            params.push(("service", service.as_str()));
        }
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.as_str()));
        }
        let url = reqwest::Url::parse_with_params(&self.realm, &params).map_err(|e| {
            RegistryError::Authentication {
                message: format!("Invalid realm '{}': {}", self.realm, e),
            }
        })?;
        Ok(url.to_string())
    }
}

/// Exchange a bearer challenge for an anonymous access token
pub async fn exchange_token<C: HttpClient + ?Sized>(
    client: &C,
    challenge: &BearerChallenge,
) -> Result<String> {
    let token_url = challenge.token_url()?;
    debug!("Exchanging for anonymous token at: {}", token_url);

    let response = client
        .get(&token_url, HashMap::new())
        .await
        .map_err(|e| RegistryError::Network {
            url: token_url.clone(),
            message: e.to_string(),
        })?;

    if !response.is_success() {
        return Err(RegistryError::Authentication {
            message: format!("Token exchange failed with status: {}", response.status),
        }
        .into());
    }

    let token_response: serde_json::Value =
        serde_json::from_slice(&response.body).map_err(|e| RegistryError::Parsing {
            url: token_url.clone(),
            message: e.to_string(),
        })?;

    let token = token_response
        .get("token")
        .or_else(|| token_response.get("access_token"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RegistryError::Authentication {
            message: "Token not found in response".to_string(),
        })?
        .to_string();

    debug!("Successfully obtained anonymous access token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TagwardenError;
    use crate::registry::client::{HttpResponse, MockHttpClient};

    const DOCKER_HUB: &str = r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull""#;

    #[test]
    fn test_parse_docker_hub_challenge() {
        let challenge = BearerChallenge::parse(DOCKER_HUB).unwrap();
        assert_eq!(challenge.realm, "https://auth.docker.io/token");
        assert_eq!(challenge.service.as_deref(), Some("registry.docker.io"));
        assert_eq!(
            challenge.scope.as_deref(),
            Some("repository:library/nginx:pull")
        );
    }

    #[test]
    fn test_parse_scope_with_comma() {
        let challenge = BearerChallenge::parse(
            r#"Bearer realm="https://auth/token",scope="repository:a/b:pull,push""#,
        )
        .unwrap();
        assert_eq!(challenge.scope.as_deref(), Some("repository:a/b:pull,push"));
        assert_eq!(challenge.service, None);
    }

    #[test]
    fn test_parse_rejects_missing_realm_and_basic() {
        assert!(matches!(
            BearerChallenge::parse(r#"Bearer service="x""#),
            Err(TagwardenError::Registry(RegistryError::Authentication { .. }))
        ));
        assert!(matches!(
            BearerChallenge::parse(r#"Basic realm="x""#),
            Err(TagwardenError::Registry(RegistryError::Authentication { .. }))
        ));
    }

    #[test]
    fn test_token_url_encodes_params() {
        let challenge = BearerChallenge::parse(DOCKER_HUB).unwrap();
        let url = challenge.token_url().unwrap();
        assert!(url.starts_with("https://auth.docker.io/token?service=registry.docker.io&scope="));
        assert!(url.contains("library%2Fnginx"));
    }

    #[tokio::test]
    async fn test_exchange_token_reads_token_or_access_token() {
        let challenge = BearerChallenge::parse(DOCKER_HUB).unwrap();
        let url = challenge.token_url().unwrap();

        let mock = MockHttpClient::new();
        mock.add_response(&url, HttpResponse::new(200, r#"{"access_token":"xyz"}"#))
            .await;
        assert_eq!(exchange_token(&mock, &challenge).await.unwrap(), "xyz");

        mock.add_response(&url, HttpResponse::new(200, r#"{"token":"abc"}"#))
            .await;
        assert_eq!(exchange_token(&mock, &challenge).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_exchange_token_without_token_field_fails() {
        let challenge = BearerChallenge::parse(DOCKER_HUB).unwrap();
        let mock = MockHttpClient::new();
        mock.add_response(
            challenge.token_url().unwrap(),
            HttpResponse::new(200, r#"{"expires_in":300}"#),
        )
        .await;

        let err = exchange_token(&mock, &challenge).await.unwrap_err();
        assert!(err.to_string().contains("Token not found"));
    }
}
