//! Client-wide error type and user-facing alerts.
//!
//! Each flow has its own error enum; [`ClientError`] unifies them for
//! callers that drive several flows (the CLI). [`Alert`] is what a screen
//! shows: a short title and an Indonesian message that never includes
//! backend internals. The `Display` text of the errors is for logs.

use thiserror::Error;
use tracing::error;

use crate::backend::BackendError;
use crate::cancel::Cancelled;
use crate::config::ConfigError;
use crate::services::{
    AuthFlowError, CatalogError, CheckoutError, OrderError, PaymentError, ProfileError,
    ScheduleError,
};
use crate::storage::StorageError;

/// Title and message for an error dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Alert with the generic "Error" title.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Any error produced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthFlowError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl ClientError {
    /// User-facing alert for this error.
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::Config(e) => {
                // Configuration problems are for whoever deployed the app.
                error!(error = %e, "Configuration error");
                Alert::error("Aplikasi belum dikonfigurasi dengan benar")
            }
            Self::Backend(e) => Alert::error(backend_message(e)),
            Self::Storage(e) => {
                error!(error = %e, "Storage error");
                Alert::error("Gagal mengakses penyimpanan perangkat")
            }
            Self::Auth(e) => e.alert(),
            Self::Profile(e) => e.alert(),
            Self::Catalog(e) => e.alert(),
            Self::Checkout(e) => e.alert(),
            Self::Schedule(e) => e.alert(),
            Self::Payment(e) => e.alert(),
            Self::Order(e) => e.alert(),
            Self::Cancelled(_) => cancelled_alert(),
        }
    }
}

pub(crate) fn cancelled_alert() -> Alert {
    Alert::new("Dibatalkan", "Permintaan dibatalkan")
}

/// User-facing description of a backend failure.
///
/// Auth messages come from the identity provider and are meant for users
/// (e.g. "Invalid login credentials"); everything else is summarized.
pub(crate) fn backend_message(err: &BackendError) -> String {
    match err {
        BackendError::Auth { message, .. } => message.clone(),
        BackendError::Http(_) => "Tidak dapat terhubung ke server. Periksa koneksi internet kamu.".to_string(),
        BackendError::RateLimited(secs) => {
            format!("Terlalu banyak permintaan. Coba lagi dalam {secs} detik.")
        }
        BackendError::Unauthorized(_) => "Sesi berakhir. Silakan login kembali.".to_string(),
        BackendError::Parse(_) | BackendError::Api { .. } | BackendError::InvalidQuery(_) => {
            "Terjadi kesalahan pada server".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_hides_internals() {
        let err = BackendError::Api {
            status: 500,
            code: Some("XX000".to_string()),
            message: "relation \"orders\" does not exist".to_string(),
        };
        let alert = ClientError::from(err).alert();
        assert_eq!(alert.title, "Error");
        assert!(!alert.message.contains("relation"));
    }

    #[test]
    fn test_auth_message_passes_through() {
        let err = BackendError::Auth {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(backend_message(&err), "Invalid login credentials");
    }

    #[test]
    fn test_cancelled_alert() {
        assert_eq!(ClientError::from(Cancelled).alert().title, "Dibatalkan");
    }
}
