//! Cart → order conversion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use catering_core::{OrderId, OrderStatus, Price};
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::backend::{BackendError, Collection, DataService, Filter, decode_rows, encode_record};
use crate::cancel::{CancelToken, Cancelled};
use crate::cart::{Cart, CartStore};
use crate::error::{Alert, backend_message, cancelled_alert};
use crate::models::{NewOrder, NewOrderItem};
use crate::session::SessionContext;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("a checkout is already in progress")]
    Busy,

    #[error("sign-in required to check out")]
    AuthRequired,

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("failed to create order: {0}")]
    OrderCreation(#[source] BackendError),

    #[error("backend did not return the new order id")]
    MissingOrderId,

    /// Line items failed; the order was deleted again.
    #[error("failed to create items for order {order_id}: {source}")]
    LineItems {
        order_id: OrderId,
        #[source]
        source: BackendError,
    },

    /// Line items failed and the order could not be deleted. `cleanup` is
    /// `None` when the delete succeeded but matched no rows.
    #[error("order {order_id} has no items and could not be removed")]
    OrphanedOrder {
        order_id: OrderId,
        #[source]
        source: BackendError,
        cleanup: Option<BackendError>,
    },
}

impl CheckoutError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::EmptyCart => Alert::new("Keranjang Kosong", "Silakan tambahkan menu terlebih dahulu"),
            Self::Busy => Alert::new("Mohon Tunggu", "Pesanan kamu sedang diproses"),
            Self::AuthRequired => Alert::new("Belum Login", "Silakan login terlebih dahulu."),
            Self::Cancelled(_) => cancelled_alert(),
            Self::OrderCreation(e) => Alert::new("Gagal Checkout", backend_message(e)),
            Self::MissingOrderId | Self::LineItems { .. } => Alert::new(
                "Gagal Checkout",
                "Terjadi kesalahan saat membuat pesanan",
            ),
            Self::OrphanedOrder { order_id, .. } => Alert::new(
                "Gagal Checkout",
                format!(
                    "Pesanan #{order_id} tersimpan tanpa item. Silakan hubungi admin."
                ),
            ),
        }
    }
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub total: Price,
    pub scheduled_date: NaiveDate,
    pub line_count: usize,
}

impl CheckoutReceipt {
    #[must_use]
    pub fn alert(&self) -> Alert {
        Alert::new("Berhasil!", "Pesanan kamu berhasil dibuat ✅")
    }
}

#[derive(Deserialize)]
struct CreatedOrder {
    id: Option<OrderId>,
}

/// Creates an order and its line items from the stored cart.
///
/// One checkout runs at a time per orchestrator (and its clones); a second
/// concurrent call fails with [`CheckoutError::Busy`].
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    cart: CartStore,
    session: SessionContext,
    data: Arc<dyn DataService>,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the checkout ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutOrchestrator {
    #[must_use]
    pub fn new(cart: CartStore, session: SessionContext, data: Arc<dyn DataService>) -> Self {
        Self {
            cart,
            session,
            data,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a checkout is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Turn the stored cart into an order scheduled for `scheduled_date`.
    ///
    /// The cart is cleared only after the order and all its line items were
    /// created. If the line items fail, the order is deleted again so no
    /// empty order is left behind.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. On every error the cart is left as it was.
    #[instrument(skip(self, cancel))]
    pub async fn checkout(
        &self,
        scheduled_date: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CheckoutError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let cart = self.cart.get_cart().await;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let user = self
            .session
            .current_user()
            .ok_or(CheckoutError::AuthRequired)?;
        let total = cart.total();

        // Last point at which the caller can back out.
        cancel.check()?;

        let order = NewOrder {
            user_id: user.id,
            total_amount: total,
            status: OrderStatus::Pending,
            scheduled_date,
        };
        let record = encode_record(&order).map_err(CheckoutError::OrderCreation)?;
        let created = self
            .data
            .insert(Collection::Orders, vec![record])
            .await
            .map_err(CheckoutError::OrderCreation)?;
        let order_id = decode_rows::<CreatedOrder>(created)
            .ok()
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.id)
            .ok_or(CheckoutError::MissingOrderId)?;

        if let Err(source) = self.insert_line_items(order_id, &cart).await {
            return Err(self.compensate(order_id, source).await);
        }

        self.cart.clear_cart().await;
        info!(order_id = %order_id, total = %total, lines = cart.len(), "Order created");

        Ok(CheckoutReceipt {
            order_id,
            total,
            scheduled_date,
            line_count: cart.len(),
        })
    }

    async fn insert_line_items(&self, order_id: OrderId, cart: &Cart) -> Result<(), BackendError> {
        let records = cart
            .lines()
            .iter()
            .map(|line| {
                encode_record(&NewOrderItem {
                    order_id,
                    menu_item_id: line.id,
                    quantity: line.quantity,
                    price: line.price,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.data.insert(Collection::OrderItems, records).await?;
        Ok(())
    }

    /// Delete an order whose line items could not be created.
    async fn compensate(&self, order_id: OrderId, source: BackendError) -> CheckoutError {
        warn!(order_id = %order_id, error = %source, "Line items failed, removing order");
        match self
            .data
            .delete(Collection::Orders, &[Filter::eq("id", order_id.as_i64())])
            .await
        {
            Ok(rows) if !rows.is_empty() => CheckoutError::LineItems { order_id, source },
            Ok(_) => {
                error!(order_id = %order_id, "Orphaned order left without items: delete matched no rows");
                CheckoutError::OrphanedOrder {
                    order_id,
                    source,
                    cleanup: None,
                }
            }
            Err(cleanup) => {
                error!(order_id = %order_id, error = %cleanup, "Orphaned order left without items");
                CheckoutError::OrphanedOrder {
                    order_id,
                    source,
                    cleanup: Some(cleanup),
                }
            }
        }
    }
}
