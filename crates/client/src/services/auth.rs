//! Sign-in, sign-up and sign-out forms.

use std::sync::Arc;

use catering_core::{Email, EmailError};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tracing::{error, instrument};

use crate::backend::{BackendError, Collection, DataService, UserIdentity};
use crate::error::{Alert, backend_message};
use crate::session::SessionContext;

/// Shortest password the sign-up form accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Errors from the sign-in and sign-up forms.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error("email and password are required")]
    MissingCredentials,

    #[error("all sign-up fields are required")]
    MissingFields,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("password must be at least 6 characters")]
    PasswordTooShort,

    #[error("password confirmation does not match")]
    PasswordMismatch,

    #[error("sign-in failed: {0}")]
    SignIn(#[source] BackendError),

    #[error("sign-up failed: {0}")]
    SignUp(#[source] BackendError),

    /// The account exists but its `profiles` row could not be written.
    #[error("profile creation failed for {user_id}: {source}")]
    ProfileCreation {
        user_id: String,
        #[source]
        source: BackendError,
    },
}

impl AuthFlowError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::MissingCredentials => Alert::error("Mohon isi email dan password"),
            Self::MissingFields => Alert::error("Mohon isi semua field"),
            Self::InvalidEmail(_) => Alert::error("Format email tidak valid"),
            Self::PasswordTooShort => Alert::error("Password minimal 6 karakter"),
            Self::PasswordMismatch => Alert::error("Password dan konfirmasi password tidak sama"),
            Self::SignIn(e) => Alert::new("Login Gagal", backend_message(e)),
            Self::SignUp(e) => Alert::new("Pendaftaran Gagal", backend_message(e)),
            Self::ProfileCreation { source, .. } => Alert::error(format!(
                "Gagal membuat profile: {}",
                backend_message(source)
            )),
        }
    }
}

/// Input of the sign-up form.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignUpForm {
    fn validate(&self) -> Result<Email, AuthFlowError> {
        let password = self.password.expose_secret();
        let required = [
            self.full_name.trim(),
            self.email.trim(),
            self.phone.trim(),
            password,
            self.confirm_password.expose_secret(),
        ];
        if required.iter().any(|field| field.is_empty()) {
            return Err(AuthFlowError::MissingFields);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthFlowError::PasswordTooShort);
        }
        if password != self.confirm_password.expose_secret() {
            return Err(AuthFlowError::PasswordMismatch);
        }
        Ok(Email::parse(&self.email)?)
    }
}

/// Outcome of a successful sign-up.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: UserIdentity,
    /// `false` when the account still needs email confirmation.
    pub signed_in: bool,
}

impl SignUpResult {
    #[must_use]
    pub fn alert(&self) -> Alert {
        Alert::new("Berhasil!", "Akun berhasil dibuat. Silakan login.")
    }
}

/// Form-level auth flows on top of [`SessionContext`].
#[derive(Clone)]
pub struct AuthFlows {
    session: SessionContext,
    data: Arc<dyn DataService>,
}

impl AuthFlows {
    #[must_use]
    pub fn new(session: SessionContext, data: Arc<dyn DataService>) -> Self {
        Self { session, data }
    }

    /// Sign in from the login form.
    ///
    /// # Errors
    ///
    /// Field errors come before any remote call; `SignIn` carries the
    /// provider's rejection.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserIdentity, AuthFlowError> {
        if email.trim().is_empty() || password.expose_secret().is_empty() {
            return Err(AuthFlowError::MissingCredentials);
        }
        let email = Email::parse(email)?;
        self.session
            .sign_in(&email, password)
            .await
            .map_err(AuthFlowError::SignIn)
    }

    /// Create an account and its `profiles` row.
    ///
    /// # Errors
    ///
    /// Field errors come before any remote call. `ProfileCreation` means the
    /// account was created but the profile was not.
    #[instrument(skip(self, form), fields(email = %form.email.trim()))]
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpResult, AuthFlowError> {
        let email = form.validate()?;
        let outcome = self
            .session
            .sign_up(&email, &form.password)
            .await
            .map_err(AuthFlowError::SignUp)?;

        let profile = json!({
            "id": outcome.user.id,
            "full_name": form.full_name.trim(),
            "phone": form.phone.trim(),
        });
        if let Err(source) = self.data.insert(Collection::Profiles, vec![profile]).await {
            error!(user_id = %outcome.user.id, error = %source, "Account created without profile");
            return Err(AuthFlowError::ProfileCreation {
                user_id: outcome.user.id.to_string(),
                source,
            });
        }

        Ok(SignUpResult {
            user: outcome.user,
            signed_in: outcome.session.is_some(),
        })
    }

    /// Sign out and keep the next start signed out.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
    }
}
