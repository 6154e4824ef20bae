//! Shopping cart kept on the device until checkout.

mod store;

pub use store::{CART_KEY, CartStore};

use catering_core::{MenuItemId, Price};
use serde::{Deserialize, Serialize};

use crate::models::MenuItem;

/// A menu item in the cart, snapshotted when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Price,
    #[serde(
        default,
        rename = "imageUrl",
        alias = "image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl CartLineItem {
    /// Snapshot a menu item with quantity 1.
    #[must_use]
    pub fn from_menu_item(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            price: item.price,
            image_url: item.image_url.clone(),
            quantity: 1,
        }
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Ordered cart lines, at most one per menu item, each with quantity ≥ 1.
///
/// Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLineItem>,
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<CartLineItem>::deserialize(deserializer).map(Self::from_lines)
    }
}

impl Cart {
    /// Empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from arbitrary lines, restoring the invariants: zero
    /// quantities become 1 and repeated ids merge into the first occurrence.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLineItem>) -> Self {
        let mut cart = Self::new();
        for mut line in lines {
            line.quantity = line.quantity.max(1);
            match cart.line_mut(line.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    fn line_mut(&mut self, id: MenuItemId) -> Option<&mut CartLineItem> {
        self.lines.iter_mut().find(|line| line.id == id)
    }

    /// Add one unit of `item`: bump the existing line or append a new one.
    pub fn add(&mut self, item: &MenuItem) {
        match self.line_mut(item.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLineItem::from_menu_item(item)),
        }
    }

    /// Change a line's quantity by `delta`, never going below 1.
    /// Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: MenuItemId, delta: i32) {
        if let Some(line) = self.line_mut(id) {
            let next = i64::from(line.quantity) + i64::from(delta);
            line.quantity = u32::try_from(next.max(1)).unwrap_or(u32::MAX);
        }
    }

    /// Drop the line for `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: MenuItemId) {
        self.lines.retain(|line| line.id != id);
    }

    /// Σ(price × quantity).
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLineItem::line_total).sum()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// Line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: MenuItemId) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| line.id == id)
    }
}
