//! End-to-end tests for the catering client.
//!
//! Every test drives a [`CateringClient`] wired to a [`MemoryBackend`], so
//! the suite needs no network or hosted project.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p catering-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - cart persistence and arithmetic
//! - `checkout_flow` - order creation and compensation
//! - `payment_flow` - payment confirmation
//! - `history_flow` - order history
//! - `session_flow` - sign-in, sign-out and restore

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use catering_client::backend::{BackendError, Collection, MemoryBackend};
use catering_client::models::MenuItem;
use catering_client::storage::{KeyValueStore, MemoryStore};
use catering_client::{CancelToken, CateringClient, ClientError, ClientOptions};
use catering_core::{MenuItemId, Price, UserId};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::json;

/// Registered customer used by most tests.
pub const CUSTOMER_EMAIL: &str = "budi@example.com";
pub const CUSTOMER_PASSWORD: &str = "rahasia1";

/// A client plus handles on its backend and local store.
pub struct TestApp {
    pub backend: MemoryBackend,
    pub store: Arc<dyn KeyValueStore>,
    pub client: CateringClient,
    pub customer: UserId,
}

impl TestApp {
    /// Fresh backend with the customer registered and the menu seeded.
    ///
    /// # Errors
    ///
    /// Returns an error if seeding fails.
    pub async fn new() -> Result<Self, BackendError> {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    /// Like [`TestApp::new`] but persisting to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if seeding fails.
    pub async fn with_store(store: Arc<dyn KeyValueStore>) -> Result<Self, BackendError> {
        let backend = MemoryBackend::new();
        let customer = backend.register_user(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await;
        seed_menu(&backend).await?;
        backend
            .seed(
                Collection::Profiles,
                vec![json!({"id": customer, "full_name": "Budi", "phone": "0812"})],
            )
            .await?;
        let client = connect(&backend, store.clone());
        Ok(Self {
            backend,
            store,
            client,
            customer,
        })
    }

    /// A second client on the same backend and store, like an app restart.
    #[must_use]
    pub fn restart(&self) -> CateringClient {
        connect(&self.backend, self.store.clone())
    }

    /// Sign the customer in.
    ///
    /// # Errors
    ///
    /// Returns the sign-in error.
    pub async fn sign_in(&self) -> Result<(), ClientError> {
        self.client
            .auth_flows()
            .sign_in(CUSTOMER_EMAIL, &SecretString::from(CUSTOMER_PASSWORD))
            .await?;
        Ok(())
    }

    /// Load a seeded menu item through the catalog.
    ///
    /// # Errors
    ///
    /// Returns the catalog error.
    pub async fn menu_item(&self, id: i64) -> Result<MenuItem, ClientError> {
        Ok(self
            .client
            .catalog()
            .item(MenuItemId::new(id), &CancelToken::new())
            .await?)
    }
}

/// Wire a client to `backend` and `store`.
#[must_use]
pub fn connect(backend: &MemoryBackend, store: Arc<dyn KeyValueStore>) -> CateringClient {
    CateringClient::assemble(
        ClientOptions::default(),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        store,
    )
}

/// Menu used across the suite:
///
/// | id | name          | price  |
/// |----|---------------|--------|
/// | 1  | Nasi Kuning   | 15000  |
/// | 2  | Ayam Bakar    | 20000  |
/// | 3  | Es Teh        | 5000   |
/// | 4  | Tumpeng Mini  | 10000  |
///
/// # Errors
///
/// Returns an error if seeding fails.
pub async fn seed_menu(backend: &MemoryBackend) -> Result<(), BackendError> {
    backend
        .seed(
            Collection::MenuItems,
            vec![
                json!({"id": 1, "name": "Nasi Kuning", "price": 15000, "category": "Nasi Box", "is_available": true}),
                json!({"id": 2, "name": "Ayam Bakar", "price": 20000, "category": "Nasi Box", "is_available": true}),
                json!({"id": 3, "name": "Es Teh", "price": 5000, "category": "Minuman", "is_available": true}),
                json!({"id": 4, "name": "Tumpeng Mini", "price": 10000, "category": "Tumpeng", "is_available": true}),
            ],
        )
        .await
}

/// A menu item that exists only on the client side.
#[must_use]
pub fn local_item(id: i64, name: &str, price: u64) -> MenuItem {
    MenuItem {
        id: MenuItemId::new(id),
        name: name.to_string(),
        description: None,
        price: Price::from_whole(price),
        image_url: None,
        category: None,
        is_available: true,
    }
}

/// A valid catering date far enough in the future.
#[must_use]
pub fn catering_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 1).unwrap_or(NaiveDate::MAX)
}
