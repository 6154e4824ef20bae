//! HTTP backend: PostgREST record API and GoTrue auth API.
//!
//! # Endpoints
//!
//! - `{base}/rest/v1/{table}` - records (GET / POST / PATCH / DELETE)
//! - `{base}/auth/v1/token`, `/signup`, `/logout`, `/user` - auth
//!
//! Every request carries the project's anon key in `apikey`. Data requests
//! send the signed-in user's access token as the bearer token so row-level
//! security applies; without a session the anon key is used instead.

mod auth;
mod data;

pub use auth::RestAuthService;
pub use data::RestDataService;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{AccessTokenProvider, BackendError};
use crate::config::BackendConfig;

/// Shared HTTP client for the hosted backend.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestBackendInner>,
}

struct RestBackendInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.inner.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl RestBackend {
    /// Create a backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be created.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("catering-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(RestBackendInner {
                client,
                base_url: config.url.clone(),
                anon_key: SecretString::from(config.anon_key().to_string()),
            }),
        })
    }

    /// Auth API client.
    #[must_use]
    pub fn auth(&self) -> RestAuthService {
        RestAuthService::new(self.clone())
    }

    /// Record API client. `tokens` supplies the user's bearer token.
    #[must_use]
    pub fn data(&self, tokens: Option<Arc<dyn AccessTokenProvider>>) -> RestDataService {
        RestDataService::new(self.clone(), tokens)
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn anon_key(&self) -> &str {
        self.inner.anon_key.expose_secret()
    }

    /// `{base}/{segments...}`, keeping any path prefix on the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidQuery("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct RecordApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Error body returned by GoTrue. Field names vary between versions.
#[derive(Debug, Deserialize)]
struct AuthApiError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}

fn record_api_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<RecordApiError>(body) {
        Ok(err) => {
            let message = match (err.message, err.details) {
                (Some(message), Some(details)) => format!("{message} ({details})"),
                (Some(message), None) => message,
                (None, Some(details)) => details,
                (None, None) => format!("HTTP {status}"),
            };
            BackendError::Api {
                status,
                code: err.code,
                message,
            }
        }
        Err(_) => BackendError::Api {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            },
        },
    }
}

fn auth_api_error(status: u16, body: &str) -> BackendError {
    let message = serde_json::from_str::<AuthApiError>(body)
        .ok()
        .and_then(|err| {
            err.error_description
                .or(err.msg)
                .or(err.message)
                .or(err.error)
        })
        .unwrap_or_else(|| format!("HTTP {status}"));
    BackendError::Auth { status, message }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn backend(url: &str) -> RestBackend {
        RestBackend::new(&BackendConfig {
            url: Url::parse(url).unwrap(),
            anon_key: SecretString::from("anon"),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let url = backend("https://abc.supabase.co")
            .endpoint(&["rest", "v1", "orders"])
            .unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/orders");
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let url = backend("http://localhost:54321/proxy/")
            .endpoint(&["auth", "v1", "user"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:54321/proxy/auth/v1/user");
    }

    #[test]
    fn test_debug_redacts_anon_key() {
        let debug = format!("{:?}", backend("https://abc.supabase.co"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("\"anon\""));
    }

    #[test]
    fn test_record_api_error_parsing() {
        let err = record_api_error(
            409,
            r#"{"code":"23503","message":"insert or update violates foreign key","details":"Key is not present","hint":null}"#,
        );
        match err {
            BackendError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("23503"));
                assert!(message.contains("foreign key"));
                assert!(message.contains("Key is not present"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            record_api_error(502, "Bad Gateway"),
            BackendError::Api { status: 502, code: None, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn test_auth_api_error_message_priority() {
        let err = auth_api_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(
            err,
            BackendError::Auth { status: 400, ref message } if message == "Invalid login credentials"
        ));

        let err = auth_api_error(422, r#"{"code":422,"msg":"User already registered"}"#);
        assert!(matches!(
            err,
            BackendError::Auth { ref message, .. } if message == "User already registered"
        ));

        let err = auth_api_error(500, "oops");
        assert!(matches!(
            err,
            BackendError::Auth { ref message, .. } if message == "HTTP 500"
        ));
    }
}
