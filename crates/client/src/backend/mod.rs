//! Remote data and auth services.
//!
//! # Architecture
//!
//! - [`DataService`]: generic record API (insert / update / select / delete
//!   over named collections with equality filters, embeds, ordering, limit)
//! - [`AuthService`]: email/password identity provider issuing bearer tokens
//! - [`RestBackend`]: PostgREST + GoTrue over HTTP
//! - [`MemoryBackend`]: in-process tables with the same embed semantics,
//!   used by tests and offline demos
//!
//! Records cross the trait boundary as `serde_json::Value`; callers decode
//! them into typed models with [`decode_rows`].

mod auth;
mod memory;
mod query;
mod rest;

pub use auth::{AccessTokenProvider, AuthService, AuthSession, SignUpOutcome, UserIdentity};
pub use memory::{MemoryBackend, Operation};
pub use query::{Field, Filter, OrderBy, Query};
pub use rest::{RestAuthService, RestBackend, RestDataService};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The record API rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend error code (e.g. a Postgres SQLSTATE), if provided.
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// The auth API rejected the request (bad credentials, duplicate user, ...).
    #[error("Auth error ({status}): {message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Human-readable message.
        message: String,
    },

    /// Missing or expired bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Query could not be built or is not supported.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Named record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Orders,
    OrderItems,
    MenuItems,
    Profiles,
    Categories,
}

impl Collection {
    /// All collections.
    pub const ALL: [Self; 5] = [
        Self::Orders,
        Self::OrderItems,
        Self::MenuItems,
        Self::Profiles,
        Self::Categories,
    ];

    /// Backend table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::OrderItems => "order_items",
            Self::MenuItems => "menu_items",
            Self::Profiles => "profiles",
            Self::Categories => "categories",
        }
    }

    /// Look up a collection by table name.
    #[must_use]
    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.table() == table)
    }

    /// Column in `self` referencing `parent.id`, if the relation exists.
    #[must_use]
    pub const fn foreign_key_to(self, parent: Self) -> Option<&'static str> {
        match (self, parent) {
            (Self::OrderItems, Self::Orders) => Some("order_id"),
            (Self::OrderItems, Self::MenuItems) => Some("menu_item_id"),
            (Self::Orders, Self::Profiles) => Some("user_id"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Generic record API.
///
/// Every method returns the affected records as JSON objects.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Insert `records` in one request and return the created rows.
    async fn insert(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<Vec<Value>, BackendError>;

    /// Set `fields` on every row matching all `filters`; returns updated rows.
    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        fields: Value,
    ) -> Result<Vec<Value>, BackendError>;

    /// Read rows.
    async fn select(&self, collection: Collection, query: &Query)
    -> Result<Vec<Value>, BackendError>;

    /// Delete every row matching all `filters`; returns deleted rows.
    async fn delete(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError>;
}

/// Decode records into typed rows.
///
/// # Errors
///
/// Returns `BackendError::Parse` if any row does not match `T`.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// Serialize a typed payload into a record.
///
/// # Errors
///
/// Returns `BackendError::Parse` if serialization fails.
pub fn encode_record<T: serde::Serialize>(record: &T) -> Result<Value, BackendError> {
    Ok(serde_json::to_value(record)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_roundtrip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_table(collection.table()), Some(collection));
        }
        assert_eq!(Collection::from_table("users"), None);
    }

    #[test]
    fn test_foreign_keys() {
        assert_eq!(
            Collection::OrderItems.foreign_key_to(Collection::Orders),
            Some("order_id")
        );
        assert_eq!(
            Collection::OrderItems.foreign_key_to(Collection::MenuItems),
            Some("menu_item_id")
        );
        assert_eq!(
            Collection::Orders.foreign_key_to(Collection::Profiles),
            Some("user_id")
        );
        assert_eq!(Collection::Orders.foreign_key_to(Collection::OrderItems), None);
        assert_eq!(Collection::Profiles.foreign_key_to(Collection::Profiles), None);
    }
}
