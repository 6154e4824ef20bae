//! Records exchanged with the backend.
//!
//! Field names follow the backend's snake_case columns. Embedded relations
//! (`order_items`, `menu_items`) deserialize from the nested JSON the record
//! API returns for `select=...,order_items(...)` queries.

mod catalog;
mod lenient;
mod order;
mod profile;

pub use catalog::{Category, MenuItem};
pub use lenient::Lenient;
pub use order::{
    HistoryEntry, MenuItemRef, NEUTRAL_BADGE_COLOR, NewOrder, NewOrderItem, Order, OrderDetail,
    OrderSummary, OrderedItem, StatusBadge, UNKNOWN_PAYMENT_LABEL,
};
pub use profile::Profile;
