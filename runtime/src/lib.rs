//! # Stockroom Runtime
//!
//! The imperative shell around `stockroom-core`.
//!
//! ## Core Components
//!
//! - **[`ReservationService`]**: create, update, complete, cancel, remove and
//!   list reservations
//! - **[`Ledger`]**: guarded stock writes with error mapping, plus the
//!   [`LedgerJournal`] that compensates a failed request
//! - **[`CatalogService`]**: product creation and deletion with their stock
//!   records
//! - **[`NotificationDispatcher`]**: best-effort, retried, detached
//!   notifications
//!
//! ## Example
//!
//! ```ignore
//! use stockroom_runtime::{ReservationEnvironment, ReservationService, NotificationDispatcher};
//!
//! let service = ReservationService::new(environment, dispatcher);
//! let view = service.create(request).await?;
//! let view = service.complete(view.reservation.id).await?;
//! ```

/// Product lifecycle with stock effects
pub mod catalog;

/// Guarded stock operations and compensation journal
pub mod ledger;

/// Prometheus metrics for observability
pub mod metrics;

/// Best-effort notification dispatch
pub mod notify;

/// Retry logic with exponential backoff
pub mod retry;

/// Reservation lifecycle operations
pub mod service;

pub use catalog::CatalogService;
pub use ledger::{Ledger, LedgerJournal};
pub use notify::{Delivery, LogNotifier, NotificationDispatcher, WebhookNotifier};
pub use retry::RetryPolicy;
pub use service::{ReservationEnvironment, ReservationService};
