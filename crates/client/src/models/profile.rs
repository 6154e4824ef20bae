//! Customer profile record.

use catering_core::UserId;
use serde::{Deserialize, Serialize};

/// Row of the `profiles` table; `id` equals the auth user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
