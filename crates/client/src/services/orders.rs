//! Order detail and the WhatsApp enquiry link.

use std::fmt::Write as _;
use std::sync::Arc;

use catering_core::OrderId;
use thiserror::Error;
use tracing::instrument;

use super::schedule::format_long_date;
use crate::backend::{BackendError, Collection, DataService, Query, decode_rows};
use crate::cancel::{CancelToken, Cancelled};
use crate::error::{Alert, backend_message, cancelled_alert};
use crate::models::OrderDetail;

const DETAIL_SELECT: &str = "
    id,
    status,
    total_amount,
    scheduled_date,
    created_at,
    order_items (
      id,
      quantity,
      price,
      menu_items ( id, name, image_url )
    )
";

/// Errors that can occur while loading an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("failed to load order: {0}")]
    Remote(#[from] BackendError),
}

impl OrderError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::NotFound(_) => Alert::error("Pesanan tidak ditemukan"),
            Self::Cancelled(_) => cancelled_alert(),
            Self::Remote(e) => Alert::error(backend_message(e)),
        }
    }
}

/// Reads single orders for the detail view.
#[derive(Clone)]
pub struct OrderService {
    data: Arc<dyn DataService>,
    contact_phone: String,
}

impl OrderService {
    #[must_use]
    pub fn new(data: Arc<dyn DataService>, contact_phone: impl Into<String>) -> Self {
        Self {
            data,
            contact_phone: contact_phone.into(),
        }
    }

    /// One order with its lines and menu names/images.
    ///
    /// Visibility is left to the backend's row policies.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row comes back, `Remote` on backend failure.
    #[instrument(skip(self, cancel))]
    pub async fn get_detail(
        &self,
        order_id: OrderId,
        cancel: &CancelToken,
    ) -> Result<OrderDetail, OrderError> {
        cancel.check()?;
        let query = Query::select(DETAIL_SELECT)?.eq("id", order_id.as_i64());
        let rows = cancel
            .run_until_cancelled(self.data.select(Collection::Orders, &query))
            .await??;
        decode_rows::<OrderDetail>(rows)?
            .into_iter()
            .next()
            .ok_or(OrderError::NotFound(order_id))
    }

    /// Caterer's WhatsApp number.
    #[must_use]
    pub fn contact_phone(&self) -> &str {
        &self.contact_phone
    }

    /// `wa.me` link asking the caterer about `order`.
    #[must_use]
    pub fn contact_url(&self, order: &OrderDetail) -> String {
        whatsapp_url(&self.contact_phone, order)
    }
}

/// Prefilled enquiry message for `order`.
#[must_use]
pub fn contact_message(order: &OrderDetail) -> String {
    let date = order
        .scheduled_date
        .map_or_else(|| "-".to_string(), format_long_date);

    let mut items = String::new();
    for (i, line) in order.order_items.iter().enumerate() {
        if i > 0 {
            items.push('\n');
        }
        let _ = write!(items, "- {} x{}", line.menu_name(), line.quantity.max(1));
    }
    if items.is_empty() {
        items.push('-');
    }

    format!(
        "Halo Admin Catering 👋\n\
         Saya ingin menanyakan pesanan berikut:\n\n\
         Order ID: {id}\n\
         Tanggal Catering: {date}\n\
         Total: {total}\n\n\
         Item:\n{items}\n\n\
         Terima kasih 🙏",
        id = order.id,
        total = order.total_amount,
    )
}

/// `https://wa.me/<phone>?text=<message>` for `order`.
#[must_use]
pub fn whatsapp_url(phone: &str, order: &OrderDetail) -> String {
    format!(
        "https://wa.me/{phone}?text={}",
        urlencoding::encode(&contact_message(order))
    )
}
