//! Wiring of stores, services and the notifier into an [`AppState`].

use crate::config::{Config, Storage};
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::StoreError;
use stockroom_core::environment::{Clock, SystemClock};
use stockroom_core::store::{
    CustomerDirectory, DetailStore, Notifier, ProductCatalog, ReservationStore, StockLedger,
};
use stockroom_core::NotifyError;
use stockroom_memory::{
    InMemoryCustomerDirectory, InMemoryDetailStore, InMemoryProductCatalog,
    InMemoryReservationStore, InMemoryStockLedger,
};
use stockroom_postgres::PostgresStore;
use stockroom_runtime::{
    CatalogService, LogNotifier, NotificationDispatcher, ReservationEnvironment,
    ReservationService, RetryPolicy, WebhookNotifier,
};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// One handle per store trait, all pointing at the same backend.
#[derive(Clone)]
pub struct Backends {
    /// Stock counters
    pub stocks: Arc<dyn StockLedger>,
    /// Products
    pub products: Arc<dyn ProductCatalog>,
    /// Reservation lines
    pub details: Arc<dyn DetailStore>,
    /// Reservation aggregates
    pub reservations: Arc<dyn ReservationStore>,
    /// Customer names for notifications
    pub customers: Arc<dyn CustomerDirectory>,
}

impl Backends {
    /// Process-local stores.
    #[must_use]
    pub fn memory() -> Self {
        let details = InMemoryDetailStore::new();
        Self {
            stocks: Arc::new(InMemoryStockLedger::new()),
            products: Arc::new(InMemoryProductCatalog::new()),
            reservations: Arc::new(InMemoryReservationStore::with_details(details.clone())),
            details: Arc::new(details),
            customers: Arc::new(InMemoryCustomerDirectory::new()),
        }
    }

    /// Every store backed by one `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(store: PostgresStore) -> Self {
        let store = Arc::new(store);
        Self {
            stocks: store.clone(),
            products: store.clone(),
            details: store.clone(),
            reservations: store.clone(),
            customers: store,
        }
    }

    /// Opens the backend selected by `config.storage`, migrating `PostgreSQL`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database is unreachable or the schema
    /// cannot be applied.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        match config.storage {
            Storage::Memory => Ok(Self::memory()),
            Storage::Postgres => {
                let store = PostgresStore::connect(
                    &config.database.url,
                    config.database.pool_settings(),
                )
                .await?;
                store.migrate().await?;
                Ok(Self::postgres(store))
            }
        }
    }

    /// Builds the services on top of these stores.
    #[must_use]
    pub fn into_state(
        self,
        notifier: Arc<dyn Notifier>,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> AppState {
        let env = ReservationEnvironment::new(
            self.stocks.clone(),
            self.products.clone(),
            self.details,
            self.reservations,
            clock,
        );
        let dispatcher = NotificationDispatcher::new(notifier, self.customers).with_policy(policy);
        AppState::new(
            ReservationService::new(env, dispatcher),
            CatalogService::new(self.stocks, self.products),
        )
    }
}

/// Webhook notifier when a URL is configured, log-only otherwise.
///
/// # Errors
///
/// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
pub fn notifier(config: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
    Ok(match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), WEBHOOK_TIMEOUT)?),
        None => Arc::new(LogNotifier),
    })
}

/// Opens the configured backend and builds the application state.
///
/// # Errors
///
/// Fails if the backend cannot be opened or the notifier cannot be built.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let backends = Backends::open(config).await?;
    let policy = RetryPolicy::builder()
        .max_retries(config.notify.max_retries)
        .build();
    Ok(backends.into_state(notifier(config)?, policy, Arc::new(SystemClock)))
}
