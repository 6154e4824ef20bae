//! Order history of the signed-in user.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::backend::{BackendError, Collection, DataService, Query, decode_rows};
use crate::cancel::{CancelToken, Cancelled};
use crate::models::HistoryEntry;
use crate::session::SessionContext;

const HISTORY_SELECT: &str = "
    *,
    order_items (
      quantity,
      price,
      menu_items ( name )
    )
";

/// Read-only projection of orders, their lines and menu names.
#[derive(Clone)]
pub struct HistoryService {
    session: SessionContext,
    data: Arc<dyn DataService>,
}

impl HistoryService {
    #[must_use]
    pub fn new(session: SessionContext, data: Arc<dyn DataService>) -> Self {
        Self { session, data }
    }

    /// All orders of the current user, newest first.
    ///
    /// Signed-out users and failed reads both yield an empty list; only
    /// cancellation is reported. Call again to refresh.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if `cancel` fires before the result is returned.
    #[instrument(skip(self, cancel))]
    pub async fn fetch(&self, cancel: &CancelToken) -> Result<Vec<HistoryEntry>, Cancelled> {
        let Some(user) = self.session.current_user() else {
            debug!("No signed-in user, history is empty");
            return Ok(Vec::new());
        };
        cancel.check()?;

        let entries = match self.load(&user.id.to_string()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to load order history");
                Vec::new()
            }
        };

        cancel.check()?;
        Ok(entries)
    }

    async fn load(&self, user_id: &str) -> Result<Vec<HistoryEntry>, BackendError> {
        let query = Query::select(HISTORY_SELECT)?
            .eq("user_id", user_id)
            .order_by("created_at", false);
        let rows = self.data.select(Collection::Orders, &query).await?;
        let mut entries: Vec<HistoryEntry> = decode_rows(rows)?;
        // The backend sorts already; keep the contract even if it does not.
        entries.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(entries)
    }
}
