//! Cart → order conversion against the in-memory backend.

#![allow(clippy::unwrap_used)]

use catering_client::backend::{Collection, Operation};
use catering_client::services::CheckoutError;
use catering_client::CancelToken;
use catering_core::Price;
use catering_integration_tests::{TestApp, catering_date};
use serde_json::json;

async fn fill_cart(app: &TestApp) {
    let nasi = app.menu_item(1).await.unwrap();
    let ayam = app.menu_item(2).await.unwrap();
    let cart = app.client.cart();
    cart.add_to_cart(&nasi).await;
    cart.add_to_cart(&nasi).await;
    cart.add_to_cart(&ayam).await;
}

#[tokio::test]
async fn test_empty_cart_writes_nothing() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();

    let err = app
        .client
        .checkout()
        .checkout(catering_date(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(app.backend.write_count().await, 0);
}

#[tokio::test]
async fn test_signed_out_checkout_rejected() {
    let app = TestApp::new().await.unwrap();
    fill_cart(&app).await;

    let err = app
        .client
        .checkout()
        .checkout(catering_date(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AuthRequired));
    assert_eq!(app.backend.write_count().await, 0);
    assert_eq!(app.client.cart().get_cart().await.len(), 2);
}

#[tokio::test]
async fn test_checkout_creates_order_and_items() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();
    fill_cart(&app).await;

    let receipt = app
        .client
        .checkout()
        .checkout(catering_date(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(receipt.total, Price::from_whole(50_000));
    assert_eq!(receipt.line_count, 2);

    let orders = app.backend.rows(Collection::Orders).await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["user_id"], json!(app.customer));
    assert_eq!(order["scheduled_date"], "2030-06-01");

    let items = app.backend.rows(Collection::OrderItems).await;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item["order_id"] == order["id"]));
    assert_eq!(items[0]["quantity"], 2);

    assert!(app.client.cart().get_cart().await.is_empty());
}

#[tokio::test]
async fn test_line_item_failure_deletes_order_and_keeps_cart() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();
    fill_cart(&app).await;
    app.backend
        .fail_next(Operation::Insert, Collection::OrderItems)
        .await;

    let err = app
        .client
        .checkout()
        .checkout(catering_date(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::LineItems { .. }));
    assert!(app.backend.rows(Collection::Orders).await.is_empty());
    assert!(app.backend.rows(Collection::OrderItems).await.is_empty());
    assert_eq!(app.client.cart().get_cart().await.len(), 2);
}

#[tokio::test]
async fn test_failed_cleanup_reports_orphan() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();
    fill_cart(&app).await;
    app.backend
        .fail_next(Operation::Insert, Collection::OrderItems)
        .await;
    app.backend.fail_next(Operation::Delete, Collection::Orders).await;

    let err = app
        .client
        .checkout()
        .checkout(catering_date(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::OrphanedOrder { .. }));
    assert!(err.alert().message.contains("hubungi admin"));
    assert_eq!(app.backend.rows(Collection::Orders).await.len(), 1);
    assert_eq!(app.client.cart().get_cart().await.len(), 2);
}

#[tokio::test]
async fn test_order_failure_keeps_cart() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();
    fill_cart(&app).await;
    app.backend.fail_next(Operation::Insert, Collection::Orders).await;

    let err = app
        .client
        .checkout()
        .checkout(catering_date(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::OrderCreation(_)));
    assert_eq!(err.alert().title, "Gagal Checkout");
    assert_eq!(app.client.cart().get_cart().await.len(), 2);
}
