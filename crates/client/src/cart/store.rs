//! Persistent cart storage.

use std::sync::Arc;

use catering_core::MenuItemId;
use tracing::{debug, warn};

use super::Cart;
use crate::models::MenuItem;
use crate::storage::KeyValueStore;

/// Storage key of the cart snapshot.
pub const CART_KEY: &str = "cart_v1";

/// Cart persisted in the local key-value store.
///
/// Every mutation writes the whole cart back (last writer wins). Mutations
/// that take a `Cart` apply to that value, so callers should pass the cart
/// they last read. Storage failures never surface: reads fall back to an
/// empty cart and failed writes are logged.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").field("key", &CART_KEY).finish()
    }
}

impl CartStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the cart; empty if absent, unreadable or malformed.
    pub async fn get_cart(&self) -> Cart {
        let raw = match self.store.get_item(CART_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read cart, starting empty");
                return Cart::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Stored cart is malformed, starting empty");
            Cart::new()
        })
    }

    /// Add one unit of `item` to the stored cart.
    pub async fn add_to_cart(&self, item: &MenuItem) -> Cart {
        let mut cart = self.get_cart().await;
        cart.add(item);
        self.persist(&cart).await;
        debug!(menu_item_id = %item.id, lines = cart.len(), "Added to cart");
        cart
    }

    /// Change the quantity of `id` in `cart` by `delta` (floor 1) and persist.
    pub async fn update_quantity(&self, mut cart: Cart, id: MenuItemId, delta: i32) -> Cart {
        cart.update_quantity(id, delta);
        self.persist(&cart).await;
        cart
    }

    /// Remove `id` from `cart` and persist.
    pub async fn remove_item(&self, mut cart: Cart, id: MenuItemId) -> Cart {
        cart.remove(id);
        self.persist(&cart).await;
        cart
    }

    /// Persist a cart handed over from elsewhere, replacing the stored one.
    pub async fn replace_cart(&self, cart: Cart) -> Cart {
        self.persist(&cart).await;
        cart
    }

    /// Delete the stored cart.
    pub async fn clear_cart(&self) {
        if let Err(e) = self.store.remove_item(CART_KEY).await {
            warn!(error = %e, "Failed to clear cart");
        }
    }

    async fn persist(&self, cart: &Cart) {
        let json = match serde_json::to_string(cart) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart");
                return;
            }
        };
        if let Err(e) = self.store.set_item(CART_KEY, &json).await {
            warn!(error = %e, "Failed to save cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use catering_core::Price;

    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    fn menu_item(id: i64, price: u64) -> MenuItem {
        MenuItem {
            id: MenuItemId::new(id),
            name: format!("Menu {id}"),
            description: None,
            price: Price::from_whole(price),
            image_url: None,
            category: None,
            is_available: true,
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        async fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        async fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    #[tokio::test]
    async fn test_mutations_persist() {
        let backing = MemoryStore::new();
        let carts = CartStore::new(Arc::new(backing.clone()));

        carts.add_to_cart(&menu_item(1, 10_000)).await;
        let cart = carts.add_to_cart(&menu_item(2, 5_000)).await;
        let cart = carts.update_quantity(cart, MenuItemId::new(2), 2).await;

        let reloaded = CartStore::new(Arc::new(backing)).get_cart().await;
        assert_eq!(reloaded, cart);
        assert_eq!(reloaded.get(MenuItemId::new(2)).unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_malformed_payload_reads_as_empty() {
        let backing = MemoryStore::new();
        backing.set_item(CART_KEY, "{\"oops\":").await.unwrap();
        let carts = CartStore::new(Arc::new(backing));
        assert!(carts.get_cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_entry() {
        let backing = MemoryStore::new();
        let carts = CartStore::new(Arc::new(backing.clone()));
        carts.add_to_cart(&menu_item(1, 10_000)).await;
        carts.clear_cart().await;
        assert_eq!(backing.get_item(CART_KEY).await.unwrap(), None);
        assert!(carts.get_cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failures_are_swallowed() {
        let carts = CartStore::new(Arc::new(BrokenStore));
        assert!(carts.get_cart().await.is_empty());

        let cart = carts.add_to_cart(&menu_item(1, 10_000)).await;
        assert_eq!(cart.len(), 1);
        carts.clear_cart().await;
    }

    #[tokio::test]
    async fn test_replace_cart() {
        let backing = MemoryStore::new();
        let carts = CartStore::new(Arc::new(backing));
        let mut incoming = Cart::new();
        incoming.add(&menu_item(5, 7_500));

        carts.replace_cart(incoming.clone()).await;
        assert_eq!(carts.get_cart().await, incoming);
    }
}
