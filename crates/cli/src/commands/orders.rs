//! `checkout`, `pay`, `summary`, `history` and `order`.

use catering_client::services::{
    PaymentForm, PaymentService, default_schedule_date, format_long_date, local_today,
    validate_schedule_date,
};
use catering_client::{CancelToken, CateringClient, ClientError};
use catering_core::{OrderId, PaymentMethod};
use chrono::NaiveDate;

use super::print_alert;

pub async fn checkout(
    client: &CateringClient,
    date: Option<NaiveDate>,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let today = local_today();
    let date = validate_schedule_date(date.unwrap_or_else(|| default_schedule_date(today)), today)?;
    let receipt = client.checkout().checkout(date, cancel).await?;

    print_alert(&receipt.alert());
    println!("Order ID         : {}", receipt.order_id);
    println!("Tanggal Catering : {}", format_long_date(receipt.scheduled_date));
    println!("Total            : {}", receipt.total);
    println!();
    println!(
        "Lanjutkan pembayaran: catering pay {} --method <cash|transfer|ewallet> --address <alamat>",
        receipt.order_id
    );
    Ok(())
}

pub async fn pay(
    client: &CateringClient,
    order_id: OrderId,
    method: PaymentMethod,
    delivery_address: String,
    notes: String,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let form = PaymentForm {
        order_id: Some(order_id),
        method: Some(method),
        delivery_address,
        notes,
    };
    client.payments().confirm(&form, cancel).await?;
    print_alert(&PaymentService::success_alert());
    Ok(())
}

pub async fn summary(
    client: &CateringClient,
    order_id: OrderId,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let summary = client.payments().load_summary(order_id, cancel).await?;
    println!("Pembayaran : {}", summary.payment_label());
    println!("Alamat     : {}", summary.delivery_address.as_deref().unwrap_or("-"));
    println!("Catatan    : {}", summary.notes.as_deref().unwrap_or("-"));
    for line in &summary.order_items {
        println!("  {} x{}  {}", line.menu_name(), line.quantity, line.line_total());
    }
    println!("Total      : {}", summary.total());
    Ok(())
}

pub async fn history(client: &CateringClient, cancel: &CancelToken) -> Result<(), ClientError> {
    if client.session().current_user().is_none() {
        println!("Silakan login untuk melihat riwayat pesanan");
        return Ok(());
    }
    let entries = client.history().fetch(cancel).await?;
    if entries.is_empty() {
        println!("Belum ada pesanan");
        return Ok(());
    }
    for entry in &entries {
        let order = &entry.order;
        println!(
            "#{}  {}  [{}]  {}  {}",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.status_badge().label,
            order.total_amount,
            order.payment_label()
        );
        for line in &entry.order_items {
            println!("      {} x{}", line.menu_name(), line.quantity);
        }
    }
    Ok(())
}

pub async fn detail(
    client: &CateringClient,
    order_id: OrderId,
    contact: bool,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let orders = client.orders();
    let order = orders.get_detail(order_id, cancel).await?;

    println!("Order #{}  [{}]", order.id, order.status_badge().label);
    println!(
        "Tanggal Catering : {}",
        order.scheduled_date.map_or_else(|| "-".to_string(), format_long_date)
    );
    println!("Dibuat           : {}", order.created_at.format("%Y-%m-%d %H:%M"));
    for line in &order.order_items {
        println!("  {} x{}  {}", line.menu_name(), line.quantity, line.line_total());
    }
    println!("Total            : {}", order.total_amount);
    if order.is_cancelled() {
        println!("Pesanan ini dibatalkan.");
    }
    if contact {
        println!();
        println!("{}", orders.contact_url(&order));
    }
    Ok(())
}
