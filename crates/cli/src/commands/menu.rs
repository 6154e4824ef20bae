//! `menu` subcommands.

use catering_client::models::MenuItem;
use catering_client::{CancelToken, CateringClient, ClientError};
use catering_core::MenuItemId;

fn print_items(items: &[MenuItem]) {
    if items.is_empty() {
        println!("Menu kosong");
        return;
    }
    for item in items {
        let availability = if item.is_available { "" } else { " (habis)" };
        println!("{:>4}  {:<32} {}{availability}", item.id, item.name, item.price);
    }
}

pub async fn categories(client: &CateringClient, cancel: &CancelToken) -> Result<(), ClientError> {
    for category in client.catalog().categories(cancel).await?.iter() {
        println!("{:>4}  {}", category.id, category.name);
    }
    Ok(())
}

pub async fn featured(client: &CateringClient, cancel: &CancelToken) -> Result<(), ClientError> {
    print_items(&client.catalog().featured_items(cancel).await?);
    Ok(())
}

pub async fn list(
    client: &CateringClient,
    category: Option<&str>,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let catalog = client.catalog();
    let items = match category {
        Some(category) => catalog.items_by_category(category, cancel).await?,
        None => {
            let names = catalog.menu_categories(cancel).await?;
            if !names.is_empty() {
                println!("Kategori: {}", names.join(", "));
            }
            catalog.all_items(cancel).await?
        }
    };
    print_items(&items);
    Ok(())
}

pub async fn show(
    client: &CateringClient,
    id: MenuItemId,
    cancel: &CancelToken,
) -> Result<(), ClientError> {
    let item = client.catalog().item(id, cancel).await?;
    println!("{}", item.name);
    println!("Harga    : {}", item.price);
    println!("Kategori : {}", item.category.as_deref().unwrap_or("-"));
    println!("Tersedia : {}", if item.is_available { "ya" } else { "tidak" });
    if let Some(description) = &item.description {
        println!();
        println!("{description}");
    }
    Ok(())
}
