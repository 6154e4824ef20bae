//! `cart` subcommands.

use catering_client::cart::Cart;
use catering_client::{CancelToken, CateringClient, ClientError};
use catering_core::MenuItemId;

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Keranjang kosong");
        return;
    }
    for line in cart.lines() {
        println!(
            "{:>4}  {:<32} {} x{} = {}",
            line.id,
            line.name,
            line.price,
            line.quantity,
            line.line_total()
        );
    }
    println!("Total ({} item): {}", cart.item_count(), cart.total());
}

pub async fn show(client: &CateringClient) {
    print_cart(&client.cart().get_cart().await);
}

pub async fn add(
    client: &CateringClient,
    id: MenuItemId,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let item = client.catalog().item(id, cancel).await?;
    let cart = client.cart().add_to_cart(&item).await;
    println!("{} ditambahkan ke keranjang", item.name);
    print_cart(&cart);
    Ok(())
}

pub async fn change(client: &CateringClient, id: MenuItemId, delta: i32) {
    let store = client.cart();
    let cart = store.update_quantity(store.get_cart().await, id, delta).await;
    print_cart(&cart);
}

pub async fn remove(client: &CateringClient, id: MenuItemId) {
    let store = client.cart();
    let cart = store.remove_item(store.get_cart().await, id).await;
    print_cart(&cart);
}

pub async fn clear(client: &CateringClient) {
    client.cart().clear_cart().await;
    println!("Keranjang dikosongkan");
}
