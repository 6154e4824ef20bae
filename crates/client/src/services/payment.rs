//! Payment confirmation: `pending` → `processing`.

use std::sync::Arc;

use catering_core::{OrderId, OrderStatus, PaymentMethod};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, instrument};

use crate::backend::{BackendError, Collection, DataService, Filter, Query, decode_rows};
use crate::cancel::{CancelToken, Cancelled};
use crate::error::{Alert, backend_message, cancelled_alert};
use crate::models::{Order, OrderSummary};
use crate::session::SessionContext;

const SUMMARY_SELECT: &str = "
    payment_method,
    delivery_address,
    notes,
    order_items (
      id,
      quantity,
      price,
      menu_items ( id, name )
    )
";

/// Errors that can occur while confirming payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("order id is missing")]
    MissingOrderId,

    #[error("payment method is missing")]
    MissingPaymentMethod,

    #[error("delivery address is empty")]
    MissingAddress,

    #[error("sign-in required to confirm payment")]
    AuthRequired,

    /// No pending order with this id belongs to the user.
    #[error("order {0} is not awaiting payment")]
    OrderNotPending(OrderId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("payment update failed: {0}")]
    Remote(#[from] BackendError),
}

impl PaymentError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::MissingOrderId | Self::OrderNotFound(_) => Alert::error("Order ID tidak ditemukan"),
            Self::MissingPaymentMethod => Alert::error("Pilih metode pembayaran terlebih dahulu"),
            Self::MissingAddress => Alert::error("Alamat pengiriman harus diisi"),
            Self::AuthRequired => Alert::error("Silakan login terlebih dahulu"),
            Self::OrderNotPending(_) => {
                Alert::error("Pesanan ini sudah dikonfirmasi atau tidak dapat diubah")
            }
            Self::Cancelled(_) => cancelled_alert(),
            Self::Remote(e) => {
                Alert::error(format!("Gagal memproses pembayaran: {}", backend_message(e)))
            }
        }
    }
}

/// Input of the payment confirmation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentForm {
    pub order_id: Option<OrderId>,
    pub method: Option<PaymentMethod>,
    pub delivery_address: String,
    pub notes: String,
}

impl PaymentForm {
    /// Check fields in form order; the first problem wins.
    ///
    /// # Errors
    ///
    /// Returns the field-specific `PaymentError`.
    pub fn validate(&self) -> Result<ValidPayment, PaymentError> {
        let order_id = self.order_id.ok_or(PaymentError::MissingOrderId)?;
        let method = self.method.ok_or(PaymentError::MissingPaymentMethod)?;
        let address = self.delivery_address.trim();
        if address.is_empty() {
            return Err(PaymentError::MissingAddress);
        }
        let notes = self.notes.trim();

        Ok(ValidPayment {
            order_id,
            method,
            delivery_address: address.to_string(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }
}

/// A validated, trimmed [`PaymentForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPayment {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub delivery_address: String,
    pub notes: Option<String>,
}

impl ValidPayment {
    fn fields(&self) -> Value {
        json!({
            "payment_method": self.method.as_str(),
            "delivery_address": self.delivery_address,
            "notes": self.notes,
            "status": OrderStatus::Processing.as_str(),
            "updated_at": chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Attaches payment details to pending orders.
#[derive(Clone)]
pub struct PaymentService {
    session: SessionContext,
    data: Arc<dyn DataService>,
}

impl PaymentService {
    #[must_use]
    pub fn new(session: SessionContext, data: Arc<dyn DataService>) -> Self {
        Self { session, data }
    }

    /// Record payment method, address and notes, and move the order to
    /// `processing`. Only the user's own `pending` orders are updated.
    ///
    /// # Errors
    ///
    /// Validation errors come first and make no remote call. Zero matching
    /// rows yields `OrderNotPending`.
    #[instrument(skip(self, form, cancel), fields(order_id = ?form.order_id))]
    pub async fn confirm(&self, form: &PaymentForm, cancel: &CancelToken) -> Result<Order, PaymentError> {
        let payment = form.validate()?;
        let user = self
            .session
            .current_user()
            .ok_or(PaymentError::AuthRequired)?;
        cancel.check()?;

        let filters = [
            Filter::eq("id", payment.order_id.as_i64()),
            Filter::eq("user_id", user.id.to_string()),
            Filter::eq("status", OrderStatus::Pending.as_str()),
        ];
        let rows = self
            .data
            .update(Collection::Orders, &filters, payment.fields())
            .await?;

        let order = decode_rows::<Order>(rows)?
            .into_iter()
            .next()
            .ok_or(PaymentError::OrderNotPending(payment.order_id))?;

        info!(order_id = %order.id, method = %payment.method, "Payment confirmed");
        Ok(order)
    }

    /// Current payment fields and lines of an order, to prefill the form.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if no such order is visible to the user.
    #[instrument(skip(self, cancel))]
    pub async fn load_summary(
        &self,
        order_id: OrderId,
        cancel: &CancelToken,
    ) -> Result<OrderSummary, PaymentError> {
        cancel.check()?;
        let query = Query::select(SUMMARY_SELECT)?.eq("id", order_id.as_i64());
        let rows = self.data.select(Collection::Orders, &query).await?;
        let summary = decode_rows::<OrderSummary>(rows)?
            .into_iter()
            .next()
            .ok_or(PaymentError::OrderNotFound(order_id))?;
        cancel.check()?;
        Ok(summary)
    }

    /// Success message shown after confirmation.
    #[must_use]
    pub fn success_alert() -> Alert {
        Alert::new(
            "Berhasil!",
            "Pembayaran/konfirmasi berhasil. Pesanan sedang diproses ✅",
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use catering_core::Price;
    use secrecy::SecretString;

    use super::*;
    use crate::backend::{MemoryBackend, Operation};
    use crate::models::Lenient;
    use crate::storage::MemoryStore;

    async fn setup() -> (MemoryBackend, SessionContext, PaymentService) {
        let backend = MemoryBackend::new();
        backend.register_user("budi@example.com", "rahasia1").await;
        let session = SessionContext::new(Arc::new(backend.clone()), Arc::new(MemoryStore::new()));
        session
            .sign_in(
                &"budi@example.com".parse().unwrap(),
                &SecretString::from("rahasia1"),
            )
            .await
            .unwrap();
        let payments = PaymentService::new(session.clone(), Arc::new(backend.clone()));
        (backend, session, payments)
    }

    async fn pending_order(backend: &MemoryBackend, session: &SessionContext) -> OrderId {
        let user = session.current_user().unwrap();
        backend
            .seed(
                Collection::MenuItems,
                vec![json!({"id": 1, "name": "Nasi Kuning", "price": 15000})],
            )
            .await
            .unwrap();
        let rows = backend
            .insert(
                Collection::Orders,
                vec![json!({"user_id": user.id.to_string(), "total_amount": "30000", "scheduled_date": "2025-03-14"})],
            )
            .await
            .unwrap();
        let id = OrderId::new(rows[0]["id"].as_i64().unwrap());
        backend
            .insert(
                Collection::OrderItems,
                vec![json!({"order_id": id.as_i64(), "menu_item_id": 1, "quantity": 2, "price": "15000"})],
            )
            .await
            .unwrap();
        id
    }

    fn form(order_id: Option<OrderId>) -> PaymentForm {
        PaymentForm {
            order_id,
            method: Some(PaymentMethod::Transfer),
            delivery_address: "  Jl. Merdeka No. 1 ".to_string(),
            notes: "   ".to_string(),
        }
    }

    #[test]
    fn test_validation_order() {
        let empty = PaymentForm::default();
        assert!(matches!(empty.validate(), Err(PaymentError::MissingOrderId)));

        let no_method = PaymentForm {
            order_id: Some(OrderId::new(1)),
            ..PaymentForm::default()
        };
        assert!(matches!(no_method.validate(), Err(PaymentError::MissingPaymentMethod)));

        let blank_address = PaymentForm {
            delivery_address: " \n\t".to_string(),
            ..form(Some(OrderId::new(1)))
        };
        assert!(matches!(blank_address.validate(), Err(PaymentError::MissingAddress)));
    }

    #[test]
    fn test_validation_trims_and_nulls_empty_notes() {
        let valid = form(Some(OrderId::new(1))).validate().unwrap();
        assert_eq!(valid.delivery_address, "Jl. Merdeka No. 1");
        assert_eq!(valid.notes, None);
        assert_eq!(valid.fields()["notes"], Value::Null);
        assert_eq!(valid.fields()["status"], "processing");
    }

    #[tokio::test]
    async fn test_empty_address_makes_no_remote_call() {
        let (backend, session, payments) = setup().await;
        let order_id = pending_order(&backend, &session).await;
        let writes_before = backend.write_count().await;

        let bad = PaymentForm {
            delivery_address: String::new(),
            ..form(Some(order_id))
        };
        let result = payments.confirm(&bad, &CancelToken::new()).await;
        assert!(matches!(result, Err(PaymentError::MissingAddress)));
        assert_eq!(backend.write_count().await, writes_before);
    }

    #[tokio::test]
    async fn test_confirm_moves_order_to_processing() {
        let (backend, session, payments) = setup().await;
        let order_id = pending_order(&backend, &session).await;
        let items_before = backend.rows(Collection::OrderItems).await;

        let order = payments
            .confirm(&form(Some(order_id)), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(order.status, Lenient::Known(OrderStatus::Processing));
        assert_eq!(order.payment_method, Some(Lenient::Known(PaymentMethod::Transfer)));
        assert_eq!(order.delivery_address.as_deref(), Some("Jl. Merdeka No. 1"));
        assert_eq!(order.notes, None);
        assert_eq!(backend.rows(Collection::OrderItems).await, items_before);
    }

    #[tokio::test]
    async fn test_second_confirmation_is_rejected() {
        let (backend, session, payments) = setup().await;
        let order_id = pending_order(&backend, &session).await;
        payments
            .confirm(&form(Some(order_id)), &CancelToken::new())
            .await
            .unwrap();

        let again = payments
            .confirm(&form(Some(order_id)), &CancelToken::new())
            .await;
        assert!(matches!(again, Err(PaymentError::OrderNotPending(id)) if id == order_id));
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_order_pending() {
        let (backend, session, payments) = setup().await;
        let order_id = pending_order(&backend, &session).await;
        backend.fail_next(Operation::Update, Collection::Orders).await;

        let result = payments
            .confirm(&form(Some(order_id)), &CancelToken::new())
            .await;
        assert!(matches!(result, Err(PaymentError::Remote(_))));
        assert_eq!(backend.rows(Collection::Orders).await[0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let (backend, session, payments) = setup().await;
        let order_id = pending_order(&backend, &session).await;
        session.sign_out().await;

        let result = payments
            .confirm(&form(Some(order_id)), &CancelToken::new())
            .await;
        assert!(matches!(result, Err(PaymentError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_load_summary() {
        let (backend, session, payments) = setup().await;
        let order_id = pending_order(&backend, &session).await;

        let summary = payments
            .load_summary(order_id, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(summary.payment_method, None);
        assert_eq!(summary.order_items.len(), 1);
        assert_eq!(summary.order_items[0].menu_name(), "Nasi Kuning");
        assert_eq!(summary.total(), Price::from_whole(30_000));

        let missing = payments
            .load_summary(OrderId::new(999), &CancelToken::new())
            .await;
        assert!(matches!(missing, Err(PaymentError::OrderNotFound(_))));
    }
}
