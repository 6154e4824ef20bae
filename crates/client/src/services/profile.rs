//! Profile of the signed-in customer.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument};

use crate::backend::{BackendError, Collection, DataService, Filter, Query, decode_rows};
use crate::error::{Alert, backend_message};
use crate::models::Profile;
use crate::session::SessionContext;

/// Errors from the profile screen.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("sign-in required")]
    AuthRequired,

    #[error("full name is required")]
    MissingFullName,

    #[error("profile not found")]
    NotFound,

    #[error("failed to load profile: {0}")]
    Load(#[source] BackendError),

    #[error("failed to update profile: {0}")]
    Update(#[source] BackendError),
}

impl ProfileError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::AuthRequired => Alert::error("Silakan login terlebih dahulu"),
            Self::MissingFullName => Alert::error("Nama lengkap harus diisi"),
            Self::NotFound => Alert::error("Profile tidak ditemukan"),
            Self::Load(e) => Alert::error(backend_message(e)),
            Self::Update(e) => Alert::error(format!(
                "Gagal memperbarui profile: {}",
                backend_message(e)
            )),
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: String,
}

/// Reads and edits the `profiles` row of the current user.
#[derive(Clone)]
pub struct ProfileService {
    session: SessionContext,
    data: Arc<dyn DataService>,
}

impl ProfileService {
    #[must_use]
    pub fn new(session: SessionContext, data: Arc<dyn DataService>) -> Self {
        Self { session, data }
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when signed out, `NotFound` if the row is missing.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Profile, ProfileError> {
        let user = self
            .session
            .current_user()
            .ok_or(ProfileError::AuthRequired)?;
        let query = Query::all().eq("id", user.id.to_string());
        let rows = self
            .data
            .select(Collection::Profiles, &query)
            .await
            .map_err(ProfileError::Load)?;
        decode_rows::<Profile>(rows)
            .map_err(ProfileError::Load)?
            .into_iter()
            .next()
            .ok_or(ProfileError::NotFound)
    }

    /// Save full name and phone. The name is trimmed and must not be empty.
    ///
    /// # Errors
    ///
    /// Returns `MissingFullName` before any remote call, `Update` on failure.
    #[instrument(skip(self, update))]
    pub async fn update(&self, update: &ProfileUpdate) -> Result<Profile, ProfileError> {
        let full_name = update.full_name.trim();
        if full_name.is_empty() {
            return Err(ProfileError::MissingFullName);
        }
        let user = self
            .session
            .current_user()
            .ok_or(ProfileError::AuthRequired)?;

        let fields = json!({
            "full_name": full_name,
            "phone": update.phone.trim(),
        });
        let rows = self
            .data
            .update(
                Collection::Profiles,
                &[Filter::eq("id", user.id.to_string())],
                fields,
            )
            .await
            .map_err(ProfileError::Update)?;
        let profile = decode_rows::<Profile>(rows)
            .map_err(ProfileError::Update)?
            .into_iter()
            .next()
            .ok_or(ProfileError::NotFound)?;

        info!(user_id = %user.id, "Profile updated");
        Ok(profile)
    }

    /// Success message shown after saving.
    #[must_use]
    pub fn success_alert() -> Alert {
        Alert::new("Berhasil", "Profile berhasil diperbarui")
    }
}
