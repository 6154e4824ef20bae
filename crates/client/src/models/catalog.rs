//! Menu and category records.

use catering_core::{CategoryId, MenuItemId, Price};
use serde::{Deserialize, Serialize};

/// A dish or package offered by the caterer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Free-text category name (not a foreign key).
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

const fn default_available() -> bool {
    true
}

/// A browsable menu category shown on the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}
