//! GoTrue auth client.

use async_trait::async_trait;
use catering_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{RestBackend, auth_api_error, retry_after};
use crate::backend::{AuthService, AuthSession, BackendError, SignUpOutcome, UserIdentity};

/// [`AuthService`] over the GoTrue API.
#[derive(Clone, Debug)]
pub struct RestAuthService {
    backend: RestBackend,
}

/// Request body for password sign-in and sign-up.
#[derive(Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// User object returned by the auth API.
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for UserIdentity {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
    /// Absolute expiry, when the server provides it.
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> AuthSession {
        AuthSession {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            user: self.user.into(),
        }
    }
}

/// Sign-up returns a session when autoconfirm is on, otherwise the bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

impl RestAuthService {
    pub(super) const fn new(backend: RestBackend) -> Self {
        Self { backend }
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        grant_type: Option<&str>,
        bearer: Option<&SecretString>,
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        let mut url = self.backend.endpoint(&["auth", "v1", path])?;
        if let Some(grant_type) = grant_type {
            url.query_pairs_mut().append_pair("grant_type", grant_type);
        }

        let mut request = self
            .backend
            .http()
            .post(url)
            .header("apikey", self.backend.anon_key())
            .json(body);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token.expose_secret()));
        }

        check(request.send().await?).await
    }
}

/// Map non-success auth responses to errors.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendError::RateLimited(retry_after(&response)));
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(auth_api_error(status.as_u16(), &body))
}

#[async_trait]
impl AuthService for RestAuthService {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let now = chrono::Utc::now().timestamp();
        let response = self
            .post_json(
                "token",
                Some("password"),
                None,
                &PasswordRequest {
                    email: email.as_str(),
                    password: password.expose_secret(),
                },
            )
            .await?;

        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(now))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUpOutcome, BackendError> {
        let now = chrono::Utc::now().timestamp();
        let response = self
            .post_json(
                "signup",
                None,
                None,
                &PasswordRequest {
                    email: email.as_str(),
                    password: password.expose_secret(),
                },
            )
            .await?;

        Ok(match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(now);
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUpOutcome {
                user: user.into(),
                session: None,
            },
        })
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let now = chrono::Utc::now().timestamp();
        let response = self
            .post_json(
                "token",
                Some("refresh_token"),
                None,
                &serde_json::json!({ "refresh_token": refresh_token.expose_secret() }),
            )
            .await?;

        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(now))
    }

    #[instrument(skip(self, access_token))]
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        self.post_json("logout", None, Some(access_token), &serde_json::json!({}))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn get_user(&self, access_token: &SecretString) -> Result<UserIdentity, BackendError> {
        let url = self.backend.endpoint(&["auth", "v1", "user"])?;
        let response = self
            .backend
            .http()
            .get(url)
            .header("apikey", self.backend.anon_key())
            .header(
                "Authorization",
                format!("Bearer {}", access_token.expose_secret()),
            )
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized(
                "access token rejected".to_string(),
            ));
        }

        let user: UserResponse = check(response).await?.json().await?;
        Ok(user.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_ID: &str = "4f0c5c1e-8a7e-4d52-9d7c-2b8f5b0c9e11";

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "user": {"id": USER_ID, "email": "budi@example.com"}
        }))
        .unwrap();

        let session = token.into_session(1_000);
        assert_eq!(session.expires_at, 1_900_000_000);
        assert_eq!(session.user.email.as_deref(), Some("budi@example.com"));
    }

    #[test]
    fn test_token_response_relative_expiry() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": {"id": USER_ID}
        }))
        .unwrap();
        assert_eq!(token.into_session(1_000).expires_at, 4_600);
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let with_session: SignUpResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": {"id": USER_ID}
        }))
        .unwrap();
        assert!(matches!(with_session, SignUpResponse::Session(_)));

        let pending_confirmation: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": USER_ID,
            "email": "budi@example.com",
            "confirmation_sent_at": "2025-03-10T08:15:00Z"
        }))
        .unwrap();
        assert!(matches!(pending_confirmation, SignUpResponse::User(_)));
    }
}
