//! Session context: the signed-in user, persisted across restarts.
//!
//! Components receive a [`SessionContext`] instead of reaching for a global
//! auth client. State changes are broadcast over a `tokio::sync::watch`
//! channel; [`SessionContext::on_auth_state_change`] wraps that in a
//! callback subscription that stops when unsubscribed or dropped.
//!
//! # Persistence
//!
//! - `auth_session` - the current session (tokens, expiry, user)
//! - `suppress_session_restore` - set by an explicit sign-out; the next
//!   [`restore`](SessionContext::restore) consumes it and starts signed out

use std::sync::Arc;

use async_trait::async_trait;
use catering_core::Email;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::{
    AccessTokenProvider, AuthService, AuthSession, BackendError, SignUpOutcome, UserIdentity,
};
use crate::storage::KeyValueStore;

/// Storage key of the persisted session.
pub const SESSION_KEY: &str = "auth_session";

/// Storage key of the one-shot "start signed out" flag.
pub const SUPPRESS_RESTORE_KEY: &str = "suppress_session_restore";

/// Refresh the access token when it expires within this many seconds.
const REFRESH_MARGIN_SECS: i64 = 60;

/// What changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Startup: the persisted session (or none) was loaded.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Current session together with the event that produced it.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthState {
    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// On-disk form of [`AuthSession`].
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    user: UserIdentity,
}

impl From<&AuthSession> for StoredSession {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session.refresh_token.expose_secret().to_string(),
            expires_at: session.expires_at,
            user: session.user.clone(),
        }
    }
}

impl From<StoredSession> for AuthSession {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: SecretString::from(stored.refresh_token),
            expires_at: stored.expires_at,
            user: stored.user,
        }
    }
}

/// Shared handle to the current auth session.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<AuthState>,
    /// Serializes token refreshes.
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user", &self.current_user())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Create a signed-out context. Call [`restore`](Self::restore) to load
    /// a persisted session.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>, store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(AuthState {
            event: AuthEvent::InitialSession,
            session: None,
        });
        Self {
            inner: Arc::new(SessionInner {
                auth,
                store,
                state,
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    /// Load the persisted session, refreshing it if the access token expired.
    ///
    /// Storage and refresh failures are logged and leave the context signed
    /// out. Emits [`AuthEvent::InitialSession`].
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Option<UserIdentity> {
        let session = self.load_persisted().await;
        let user = session.as_ref().map(|s| s.user.clone());
        self.inner.state.send_replace(AuthState {
            event: AuthEvent::InitialSession,
            session,
        });
        user
    }

    async fn load_persisted(&self) -> Option<AuthSession> {
        let store = &self.inner.store;

        match store.get_item(SUPPRESS_RESTORE_KEY).await {
            Ok(Some(_)) => {
                info!("Session restore suppressed after sign-out");
                if let Err(e) = store.remove_item(SUPPRESS_RESTORE_KEY).await {
                    warn!(error = %e, "Failed to clear restore suppression flag");
                }
                self.forget_persisted().await;
                return None;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read restore suppression flag"),
        }

        let raw = match store.get_item(SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        let session: AuthSession = match serde_json::from_str::<StoredSession>(&raw) {
            Ok(stored) => stored.into(),
            Err(e) => {
                warn!(error = %e, "Discarding malformed persisted session");
                self.forget_persisted().await;
                return None;
            }
        };

        if !session.is_expired() {
            return Some(session);
        }

        debug!("Persisted session expired, refreshing");
        match self.inner.auth.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                self.persist(&fresh).await;
                Some(fresh)
            }
            Err(e) => {
                warn!(error = %e, "Could not refresh persisted session");
                self.forget_persisted().await;
                None
            }
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.inner.state.borrow().user().cloned()
    }

    /// The current session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<AuthSession> {
        self.inner.state.borrow().session.clone()
    }

    /// Access token for data requests, refreshed first if it is about to
    /// expire. A failed refresh keeps the old token; the backend will reject
    /// it if it really expired.
    pub async fn access_token(&self) -> Option<SecretString> {
        let session = self.current_session()?;
        if !session.expires_within(REFRESH_MARGIN_SECS) {
            return Some(session.access_token);
        }

        let _guard = self.inner.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        let session = self.current_session()?;
        if !session.expires_within(REFRESH_MARGIN_SECS) {
            return Some(session.access_token);
        }

        match self.inner.auth.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                self.persist(&fresh).await;
                let token = fresh.access_token.clone();
                self.inner.state.send_replace(AuthState {
                    event: AuthEvent::TokenRefreshed,
                    session: Some(fresh),
                });
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Some(session.access_token)
            }
        }
    }

    /// Sign in with email and password. Emits [`AuthEvent::SignedIn`].
    ///
    /// # Errors
    ///
    /// Returns the auth service's error (bad credentials, network, ...).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<UserIdentity, BackendError> {
        let session = self
            .inner
            .auth
            .sign_in_with_password(email, password)
            .await?;
        let user = session.user.clone();
        self.start_session(session).await;
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Register a new account. If the service returns a session (no email
    /// confirmation required) the user is signed in right away.
    ///
    /// # Errors
    ///
    /// Returns the auth service's error (duplicate user, weak password, ...).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUpOutcome, BackendError> {
        let outcome = self.inner.auth.sign_up(email, password).await?;
        if let Some(session) = &outcome.session {
            self.start_session(session.clone()).await;
        }
        info!(user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "Signed up");
        Ok(outcome)
    }

    /// Sign out locally and revoke the session remotely (best effort).
    ///
    /// Sets the restore-suppression flag so the next start is signed out even
    /// if clearing the persisted session failed. Emits [`AuthEvent::SignedOut`].
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let previous = self.current_session();

        if let Err(e) = self.inner.store.set_item(SUPPRESS_RESTORE_KEY, "1").await {
            warn!(error = %e, "Failed to set restore suppression flag");
        }
        self.forget_persisted().await;
        self.inner.state.send_replace(AuthState {
            event: AuthEvent::SignedOut,
            session: None,
        });

        if let Some(session) = previous
            && let Err(e) = self.inner.auth.sign_out(&session.access_token).await
        {
            warn!(error = %e, "Remote sign-out failed; local session cleared anyway");
        }
        info!("Signed out");
    }

    /// Receiver for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Call `callback` with the current state, then on every change.
    ///
    /// Changes that happen faster than the callback runs are coalesced; the
    /// callback always sees the latest state. Must be called inside a tokio
    /// runtime.
    pub fn on_auth_state_change<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let mut rx = self.subscribe();
        let handle = tokio::spawn(async move {
            let current = rx.borrow_and_update().clone();
            callback(&current);
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                callback(&state);
            }
        });
        AuthSubscription { handle }
    }

    async fn start_session(&self, session: AuthSession) {
        self.persist(&session).await;
        if let Err(e) = self.inner.store.remove_item(SUPPRESS_RESTORE_KEY).await {
            warn!(error = %e, "Failed to clear restore suppression flag");
        }
        self.inner.state.send_replace(AuthState {
            event: AuthEvent::SignedIn,
            session: Some(session),
        });
    }

    async fn persist(&self, session: &AuthSession) {
        let result = match serde_json::to_string(&StoredSession::from(session)) {
            Ok(json) => self
                .inner
                .store
                .set_item(SESSION_KEY, &json)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    async fn forget_persisted(&self) {
        if let Err(e) = self.inner.store.remove_item(SESSION_KEY).await {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

#[async_trait]
impl AccessTokenProvider for SessionContext {
    async fn access_token(&self) -> Option<SecretString> {
        Self::access_token(self).await
    }
}

/// Handle for an [`on_auth_state_change`](SessionContext::on_auth_state_change)
/// callback. The callback stops on [`unsubscribe`](Self::unsubscribe) or drop.
#[derive(Debug)]
pub struct AuthSubscription {
    handle: JoinHandle<()>,
}

impl AuthSubscription {
    /// Stop delivering state changes.
    pub fn unsubscribe(self) {
        self.handle.abort();
    }

    /// Whether the callback task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
