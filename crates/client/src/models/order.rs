//! Order records and their projections.

use std::borrow::Cow;

use catering_core::{MenuItemId, OrderId, OrderItemId, OrderStatus, PaymentMethod, Price, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Lenient;

/// Badge color for status values this client does not recognise.
pub const NEUTRAL_BADGE_COLOR: &str = "#999999";

/// Label shown when no (or an unrecognised) payment method is recorded.
pub const UNKNOWN_PAYMENT_LABEL: &str = "-";

/// A full row of the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Price,
    #[serde(default, deserialize_with = "Lenient::nullable")]
    pub status: Lenient<OrderStatus>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<Lenient<PaymentMethod>>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Status badge for list and detail views.
    #[must_use]
    pub fn status_badge(&self) -> StatusBadge<'_> {
        StatusBadge::for_status(&self.status)
    }

    /// Display label of the recorded payment method.
    #[must_use]
    pub fn payment_label(&self) -> &'static str {
        payment_label(self.payment_method.as_ref())
    }
}

/// Localized label and color for an order status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge<'a> {
    pub label: Cow<'a, str>,
    pub color: &'static str,
}

impl<'a> StatusBadge<'a> {
    /// Map a status to its badge. Unknown values show verbatim in a neutral
    /// color, and a missing status shows as `-`.
    #[must_use]
    pub fn for_status(status: &'a Lenient<OrderStatus>) -> Self {
        match status {
            Lenient::Known(status) => Self {
                label: Cow::Borrowed(status.label()),
                color: status.color(),
            },
            Lenient::Unknown(raw) if raw.is_empty() => Self {
                label: Cow::Borrowed("-"),
                color: NEUTRAL_BADGE_COLOR,
            },
            Lenient::Unknown(raw) => Self {
                label: Cow::Borrowed(raw.as_str()),
                color: NEUTRAL_BADGE_COLOR,
            },
        }
    }
}

fn payment_label(method: Option<&Lenient<PaymentMethod>>) -> &'static str {
    match method {
        Some(Lenient::Known(method)) => method.label(),
        _ => UNKNOWN_PAYMENT_LABEL,
    }
}

/// Insert payload for a new order. The backend fills `id` and timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub scheduled_date: NaiveDate,
}

/// Insert payload for one `order_items` row.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    /// Unit price at the time of ordering.
    pub price: Price,
}

/// Menu fields embedded under an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemRef {
    #[serde(default)]
    pub id: Option<MenuItemId>,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// An order line with its menu item joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    #[serde(default)]
    pub id: Option<OrderItemId>,
    /// Null or zero quantities count as one unit.
    #[serde(default = "one", deserialize_with = "quantity_at_least_one")]
    pub quantity: u32,
    pub price: Price,
    #[serde(default, rename = "menu_items")]
    pub menu_item: Option<MenuItemRef>,
}

const fn one() -> u32 {
    1
}

fn quantity_at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(1).max(1))
}

impl OrderedItem {
    /// Menu item name, or `-` if the item has since been deleted.
    #[must_use]
    pub fn menu_name(&self) -> &str {
        self.menu_item.as_ref().map_or("-", |item| item.name.as_str())
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// One entry of the order history: the order row plus its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub order_items: Vec<OrderedItem>,
}

/// Payment fields of an order, used to prefill the confirmation form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderSummary {
    #[serde(default)]
    pub payment_method: Option<Lenient<PaymentMethod>>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub order_items: Vec<OrderedItem>,
}

impl OrderSummary {
    /// Sum of the line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.order_items.iter().map(OrderedItem::line_total).sum()
    }

    /// Display label of the recorded payment method.
    #[must_use]
    pub fn payment_label(&self) -> &'static str {
        payment_label(self.payment_method.as_ref())
    }
}

/// Order detail view.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderDetail {
    pub id: OrderId,
    #[serde(default, deserialize_with = "Lenient::nullable")]
    pub status: Lenient<OrderStatus>,
    pub total_amount: Price,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub order_items: Vec<OrderedItem>,
}

impl OrderDetail {
    /// Status badge for the detail header.
    #[must_use]
    pub fn status_badge(&self) -> StatusBadge<'_> {
        StatusBadge::for_status(&self.status)
    }

    /// Whether the caterer cancelled this order.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status.known() == Some(OrderStatus::Cancelled)
    }
}
