//! # Stockroom Core
//!
//! Domain types and pure logic for the Stockroom inventory reservation engine.
//!
//! Customers reserve line items against finite stock; staff later confirm
//! (fulfil) or cancel those reservations. This crate holds everything about
//! that problem that does not perform I/O:
//!
//! - **Types**: identifiers, [`Money`], [`Stock`], [`Product`],
//!   [`ReservationDetail`], [`Reservation`] and the request shapes
//! - **Store traits**: the persistence seam ([`store`]) implemented by the
//!   in-memory and `PostgreSQL` backends
//! - **Line-diff engine**: [`diff::plan_line_changes`] turns "current lines"
//!   plus "requested lines" into a [`diff::LinePlan`]
//! - **Status rules**: which stock movement a status change or a removal
//!   implies ([`status`])
//! - **Errors**: the boundary taxonomy ([`ReservationError`])
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ stockroom-runtime (imperative shell)       │  ← ledger writes, persistence,
//! │   ReservationService, Ledger, Notifier     │    notifications, metrics
//! ├────────────────────────────────────────────┤
//! │ stockroom-core (functional core)           │
//! │   LinePlan, StockEffect, validation        │  ← deterministic, no I/O
//! └────────────────────────────────────────────┘
//! ```
//!
//! Stock counters are never mutated here. The runtime applies a plan through
//! the conditional writes of [`store::StockLedger`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod diff;
pub mod environment;
pub mod error;
pub mod status;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{NotifyError, ReservationError, StoreError};
pub use status::StockEffect;
pub use types::*;
pub use validation::ValidationError;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
