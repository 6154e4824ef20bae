//! Identity provider interface.

use async_trait::async_trait;
use catering_core::{Email, UserId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::BackendError;

/// The authenticated user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Bearer tokens for a signed-in user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Bearer token for data requests.
    pub access_token: SecretString,
    /// Token used to obtain a fresh access token.
    pub refresh_token: SecretString,
    /// Unix timestamp when the access token expires.
    pub expires_at: i64,
    pub user: UserIdentity,
}

impl AuthSession {
    /// Check if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 60 seconds remaining
        self.expires_within(60)
    }

    /// Check if the access token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - seconds
    }
}

/// Result of a sign-up request.
///
/// `session` is `None` when the project requires email confirmation before
/// the first sign-in.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: UserIdentity,
    pub session: Option<AuthSession>,
}

/// Email/password identity provider.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange credentials for a session.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError>;

    /// Register a new account.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUpOutcome, BackendError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &SecretString)
    -> Result<AuthSession, BackendError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError>;

    /// Resolve the user behind `access_token`.
    async fn get_user(&self, access_token: &SecretString) -> Result<UserIdentity, BackendError>;
}

/// Source of the bearer token attached to data requests.
///
/// Implementations refresh the token when it is close to expiring. `None`
/// means the request goes out with the anon key only.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<SecretString>;
}
