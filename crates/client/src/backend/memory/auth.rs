//! In-memory identity provider.

use std::collections::HashMap;

use async_trait::async_trait;
use catering_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use super::MemoryBackend;
use crate::backend::{AuthService, AuthSession, BackendError, SignUpOutcome, UserIdentity};

const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Default)]
pub(super) struct AuthTables {
    /// Keyed by lowercased email.
    users: HashMap<String, MemoryUser>,
    /// Access token -> grant.
    access: HashMap<String, AccessGrant>,
    /// Refresh token -> user.
    refresh: HashMap<String, UserIdentity>,
    require_confirmation: bool,
    token_ttl: Option<i64>,
}

struct MemoryUser {
    identity: UserIdentity,
    password: String,
}

struct AccessGrant {
    user: UserIdentity,
    expires_at: i64,
}

impl AuthTables {
    fn issue_session(&mut self, user: UserIdentity) -> AuthSession {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at =
            chrono::Utc::now().timestamp() + self.token_ttl.unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        self.access.insert(
            access_token.clone(),
            AccessGrant {
                user: user.clone(),
                expires_at,
            },
        );
        self.refresh.insert(refresh_token.clone(), user.clone());

        AuthSession {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
            expires_at,
            user,
        }
    }
}

fn invalid_credentials() -> BackendError {
    BackendError::Auth {
        status: 400,
        message: "Invalid login credentials".to_string(),
    }
}

impl MemoryBackend {
    /// Create a confirmed account directly.
    pub async fn register_user(&self, email: &str, password: &str) -> UserId {
        let id = UserId::new(Uuid::new_v4());
        self.inner.auth.lock().await.users.insert(
            email.trim().to_lowercase(),
            MemoryUser {
                identity: UserIdentity {
                    id,
                    email: Some(email.trim().to_string()),
                },
                password: password.to_string(),
            },
        );
        id
    }

    /// When set, sign-up returns no session (email confirmation pending).
    pub async fn require_email_confirmation(&self, required: bool) {
        self.inner.auth.lock().await.require_confirmation = required;
    }

    /// Lifetime of newly issued access tokens. Zero or negative issues
    /// already-expired sessions.
    pub async fn set_token_ttl(&self, seconds: i64) {
        self.inner.auth.lock().await.token_ttl = Some(seconds);
    }

    /// Number of access tokens currently valid or not yet revoked.
    pub async fn active_token_count(&self) -> usize {
        self.inner.auth.lock().await.access.len()
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let mut auth = self.inner.auth.lock().await;
        let user = auth
            .users
            .get(&email.as_str().to_lowercase())
            .filter(|user| user.password == password.expose_secret())
            .map(|user| user.identity.clone())
            .ok_or_else(invalid_credentials)?;
        Ok(auth.issue_session(user))
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUpOutcome, BackendError> {
        let mut auth = self.inner.auth.lock().await;
        let key = email.as_str().to_lowercase();
        if auth.users.contains_key(&key) {
            return Err(BackendError::Auth {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(BackendError::Auth {
                status: 422,
                message: format!("Password should be at least {MIN_PASSWORD_LENGTH} characters."),
            });
        }

        let identity = UserIdentity {
            id: UserId::new(Uuid::new_v4()),
            email: Some(email.as_str().to_string()),
        };
        auth.users.insert(
            key,
            MemoryUser {
                identity: identity.clone(),
                password: password.expose_secret().to_string(),
            },
        );

        let session = if auth.require_confirmation {
            None
        } else {
            Some(auth.issue_session(identity.clone()))
        };
        Ok(SignUpOutcome {
            user: identity,
            session,
        })
    }

    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let mut auth = self.inner.auth.lock().await;
        // Refresh tokens are single-use.
        let user = auth
            .refresh
            .remove(refresh_token.expose_secret())
            .ok_or_else(|| BackendError::Auth {
                status: 400,
                message: "Invalid Refresh Token: Refresh Token Not Found".to_string(),
            })?;
        Ok(auth.issue_session(user))
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        self.inner
            .auth
            .lock()
            .await
            .access
            .remove(access_token.expose_secret());
        Ok(())
    }

    async fn get_user(&self, access_token: &SecretString) -> Result<UserIdentity, BackendError> {
        let auth = self.inner.auth.lock().await;
        let now = chrono::Utc::now().timestamp();
        auth.access
            .get(access_token.expose_secret())
            .filter(|grant| grant.expires_at > now)
            .map(|grant| grant.user.clone())
            .ok_or_else(|| BackendError::Unauthorized("invalid or expired access token".to_string()))
    }
}
