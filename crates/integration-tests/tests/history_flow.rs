//! Order history after several checkouts.

#![allow(clippy::unwrap_used)]

use catering_client::models::Lenient;
use catering_client::services::PaymentForm;
use catering_client::CancelToken;
use catering_core::{OrderStatus, PaymentMethod};
use catering_integration_tests::{TestApp, catering_date};

#[tokio::test]
async fn test_history_newest_first_with_statuses() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();
    let cancel = CancelToken::new();

    let mut placed = Vec::new();
    for id in [1, 2, 3] {
        let item = app.menu_item(id).await.unwrap();
        app.client.cart().add_to_cart(&item).await;
        let receipt = app
            .client
            .checkout()
            .checkout(catering_date(), &cancel)
            .await
            .unwrap();
        placed.push(receipt.order_id);
    }
    app.client
        .payments()
        .confirm(
            &PaymentForm {
                order_id: Some(placed[0]),
                method: Some(PaymentMethod::Cash),
                delivery_address: "Jl. Merdeka 1".to_string(),
                notes: String::new(),
            },
            &cancel,
        )
        .await
        .unwrap();

    let history = app.client.history().fetch(&cancel).await.unwrap();
    let ids: Vec<_> = history.iter().map(|entry| entry.order.id).collect();
    assert_eq!(ids, [placed[2], placed[1], placed[0]]);
    assert!(history.windows(2).all(|w| w[0].order.created_at >= w[1].order.created_at));

    let oldest = &history[2];
    assert_eq!(oldest.order.status, Lenient::Known(OrderStatus::Processing));
    assert_eq!(oldest.order.status_badge().label, "Diproses");
    assert_eq!(oldest.order.payment_label(), "Cash on Delivery");
    assert_eq!(oldest.order_items[0].menu_name(), "Nasi Kuning");
    assert_eq!(history[0].order.payment_label(), "-");
}

#[tokio::test]
async fn test_history_empty_when_signed_out() {
    let app = TestApp::new().await.unwrap();
    let history = app.client.history().fetch(&CancelToken::new()).await.unwrap();
    assert!(history.is_empty());
}
