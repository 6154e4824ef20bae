//! Cart behaviour across the client and its persisted store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use catering_client::cart::CART_KEY;
use catering_client::storage::{FileStore, KeyValueStore};
use catering_core::{MenuItemId, Price};
use catering_integration_tests::{TestApp, local_item};

#[tokio::test]
async fn test_add_remove_scenario() {
    let app = TestApp::new().await.unwrap();
    let cart = app.client.cart();
    let a = local_item(10, "A", 10_000);
    let b = local_item(11, "B", 5_000);

    cart.add_to_cart(&a).await;
    cart.add_to_cart(&a).await;
    cart.add_to_cart(&b).await;
    let current = cart.get_cart().await;
    let after = cart.remove_item(current, a.id).await;

    assert_eq!(after.len(), 1);
    let line = &after.lines()[0];
    assert_eq!(line.id, b.id);
    assert_eq!(line.quantity, 1);
    assert_eq!(line.price, Price::from_whole(5_000));
    assert_eq!(after.total(), Price::from_whole(5_000));
    assert_eq!(cart.get_cart().await, after);
}

#[tokio::test]
async fn test_repeated_add_accumulates_one_line() {
    let app = TestApp::new().await.unwrap();
    let item = app.menu_item(1).await.unwrap();
    for _ in 0..4 {
        app.client.cart().add_to_cart(&item).await;
    }
    let cart = app.client.cart().get_cart().await;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.get(item.id).unwrap().quantity, 4);
}

#[tokio::test]
async fn test_quantity_never_below_one() {
    let app = TestApp::new().await.unwrap();
    let store = app.client.cart();
    let cart = store.add_to_cart(&local_item(1, "Nasi Kuning", 15_000)).await;
    let cart = store.update_quantity(cart, MenuItemId::new(1), 2).await;
    assert_eq!(cart.get(MenuItemId::new(1)).unwrap().quantity, 3);
    let cart = store.update_quantity(cart, MenuItemId::new(1), -10).await;
    assert_eq!(cart.get(MenuItemId::new(1)).unwrap().quantity, 1);
}

#[tokio::test]
async fn test_totals() {
    let app = TestApp::new().await.unwrap();
    let store = app.client.cart();
    let nasi = app.menu_item(1).await.unwrap();
    let ayam = app.menu_item(2).await.unwrap();
    store.add_to_cart(&nasi).await;
    store.add_to_cart(&nasi).await;
    let cart = store.add_to_cart(&ayam).await;
    assert_eq!(cart.total(), Price::from_whole(50_000));
    assert_eq!(cart.item_count(), 3);
}

#[tokio::test]
async fn test_malformed_payload_reads_as_empty() {
    let app = TestApp::new().await.unwrap();
    app.store.set_item(CART_KEY, "{not json").await.unwrap();
    assert!(app.client.cart().get_cart().await.is_empty());
}

#[tokio::test]
async fn test_cart_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::with_store(Arc::new(FileStore::new(dir.path())))
        .await
        .unwrap();
    let item = app.menu_item(3).await.unwrap();
    app.client.cart().add_to_cart(&item).await;

    let restarted = app.restart();
    let cart = restarted.cart().get_cart().await;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].name, "Es Teh");
    assert!(dir.path().join(format!("{CART_KEY}.json")).exists());
}
