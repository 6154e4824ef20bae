//! Client handle shared by every screen or command.

use std::sync::Arc;

use tracing::info;

use crate::backend::{AuthService, DataService, RestBackend};
use crate::cart::CartStore;
use crate::config::{ClientConfig, ClientOptions};
use crate::error::ClientError;
use crate::services::{
    AuthFlows, CatalogService, CheckoutOrchestrator, HistoryService, OrderService, PaymentService,
    ProfileService,
};
use crate::session::SessionContext;
use crate::storage::{FileStore, KeyValueStore};

/// Wires backend, storage and session into the flow services.
///
/// This struct is cheaply cloneable via `Arc`; all clones share one session,
/// one cart and one catalog cache.
#[derive(Clone)]
pub struct CateringClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    options: ClientOptions,
    session: SessionContext,
    cart: CartStore,
    checkout: CheckoutOrchestrator,
    payments: PaymentService,
    history: HistoryService,
    orders: OrderService,
    catalog: CatalogService,
    auth_flows: AuthFlows,
    profile: ProfileService,
}

impl CateringClient {
    /// Connect to the hosted backend and restore any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let backend = RestBackend::new(&config.backend)?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.data_dir));
        let session = SessionContext::new(Arc::new(backend.auth()), store.clone());
        let data: Arc<dyn DataService> = Arc::new(backend.data(Some(Arc::new(session.clone()))));

        let client = Self::with_session(config.options.clone(), session, data, store);
        if let Some(user) = client.session().restore().await {
            info!(user_id = %user.id, "Session restored");
        }
        Ok(client)
    }

    /// Build a client from explicit parts (e.g. [`MemoryBackend`](crate::backend::MemoryBackend)).
    ///
    /// The persisted session is not restored; call
    /// [`SessionContext::restore`] when needed.
    #[must_use]
    pub fn assemble(
        options: ClientOptions,
        auth: Arc<dyn AuthService>,
        data: Arc<dyn DataService>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let session = SessionContext::new(auth, store.clone());
        Self::with_session(options, session, data, store)
    }

    fn with_session(
        options: ClientOptions,
        session: SessionContext,
        data: Arc<dyn DataService>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let cart = CartStore::new(store);
        let checkout = CheckoutOrchestrator::new(cart.clone(), session.clone(), data.clone());
        let payments = PaymentService::new(session.clone(), data.clone());
        let history = HistoryService::new(session.clone(), data.clone());
        let orders = OrderService::new(data.clone(), options.contact_phone.clone());
        let catalog = CatalogService::new(data.clone(), options.catalog_cache_ttl);
        let auth_flows = AuthFlows::new(session.clone(), data.clone());
        let profile = ProfileService::new(session.clone(), data);

        Self {
            inner: Arc::new(ClientInner {
                options,
                session,
                cart,
                checkout,
                payments,
                history,
                orders,
                catalog,
                auth_flows,
                profile,
            }),
        }
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Shared auth session.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.inner.checkout
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }

    #[must_use]
    pub fn history(&self) -> &HistoryService {
        &self.inner.history
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn auth_flows(&self) -> &AuthFlows {
        &self.inner.auth_flows
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.inner.profile
    }
}
