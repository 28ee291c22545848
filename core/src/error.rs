//! Error taxonomy.
//!
//! [`StoreError`] is what persistence backends return. [`ReservationError`]
//! is what the reservation engine reports at its boundary; the web layer maps
//! each variant onto an HTTP status.

use crate::types::{ProductId, ReservationId, StockId};
use crate::validation::ValidationError;
use thiserror::Error;

/// Errors returned by store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors reported by reservation and catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Request rejected before any mutation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No reservation with this id.
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),

    /// A referenced product does not exist.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// A product's stock record does not exist.
    #[error("Stock {0} not found")]
    StockNotFound(StockId),

    /// Not enough unheld units to satisfy a hold.
    #[error(
        "Insufficient stock for product {product_name} ({product}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// Product that could not be reserved
        product: ProductId,
        /// Its display name
        product_name: String,
        /// Units requested by this operation
        requested: u32,
        /// Units available when the hold was rejected
        available: u32,
    },

    /// A release or confirm asked for more units than are held.
    ///
    /// This is an invariant violation: it means the ledger and the
    /// reservations disagree, not that the caller did something wrong.
    #[error("Invariant violation on stock {stock}: requested {requested}, only {held} held")]
    InsufficientHold {
        /// Stock record involved
        stock: StockId,
        /// Units the operation tried to release or confirm
        requested: u32,
        /// Units actually held at the time of the read
        held: u32,
    },

    /// Another request changed or removed the reservation after it was read.
    #[error("Reservation {0} was modified concurrently")]
    Conflict(ReservationId),

    /// The product's stock still has units held against it.
    #[error("Product {product} still has {reserved} units reserved")]
    ProductInUse {
        /// Product that could not be deleted
        product: ProductId,
        /// Units held when the delete was rejected
        reserved: u32,
    },

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from delivering a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The notification could not be sent (connection, timeout, ...).
    #[error("Notification transport failed: {0}")]
    Transport(String),

    /// The receiver answered with a non-success status.
    #[error("Notification rejected with status {status}")]
    Rejected {
        /// HTTP-style status code
        status: u16,
    },
}

impl NotifyError {
    /// Whether another attempt might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status } => *status >= 500 || *status == 429,
        }
    }
}

impl ReservationError {
    /// Whether retrying the same request might succeed.
    ///
    /// Transient database failures and lost races qualify; validation,
    /// not-found, stock and invariant errors are deterministic.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Database(_)) | Self::Conflict(_))
    }

    /// Whether this error signals ledger corruption rather than a bad request.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InsufficientHold { .. })
    }

    /// Whether this error is a not-found of any kind.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ReservationNotFound(_)
                | Self::ProductNotFound(_)
                | Self::StockNotFound(_)
                | Self::Store(StoreError::NotFound(_))
        )
    }
}
