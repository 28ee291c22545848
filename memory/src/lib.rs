//! Process-local backend for the stockroom store traits.
//!
//! Every store keeps its records behind an `Arc<RwLock<HashMap>>`, so clones
//! share state. Each conditional write runs inside one write-lock critical
//! section, which gives the same atomicity as a single conditional `UPDATE`.
//!
//! - [`InMemoryStockLedger`]
//! - [`InMemoryProductCatalog`]
//! - [`InMemoryDetailStore`]
//! - [`InMemoryReservationStore`], which shares its line map with an
//!   [`InMemoryDetailStore`] so a reservation and its lines change together
//! - [`InMemoryCustomerDirectory`]
//!
//! Everything is lost when the process exits.
//!
//! # Example
//!
//! ```
//! use stockroom_memory::{InMemoryDetailStore, InMemoryReservationStore};
//!
//! let details = InMemoryDetailStore::new();
//! let reservations = InMemoryReservationStore::with_details(details.clone());
//! assert!(reservations.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod ledger;
mod reservations;

pub use catalog::{InMemoryCustomerDirectory, InMemoryProductCatalog};
pub use ledger::InMemoryStockLedger;
pub use reservations::{InMemoryDetailStore, InMemoryReservationStore};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// A panic while holding a lock leaves the map itself intact: every write
// below completes its mutation before releasing the guard.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
