//! Persistence seam.
//!
//! Every store is an object-safe trait so services can hold them as
//! `Arc<dyn Trait>` and swap the in-memory and `PostgreSQL` backends.
//!
//! # Design
//!
//! These traits use explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` to remain dyn-compatible.
//!
//! # Stock ledger contract
//!
//! [`StockLedger`] is the only component allowed to write `quantity` and
//! `reserved`. Each guarded method must be a single conditional write in the
//! backing store, never a read followed by a write:
//!
//! | Method        | Guard                          | Effect                        |
//! |---------------|--------------------------------|-------------------------------|
//! | `try_reserve` | `quantity - reserved >= n`     | `reserved += n`               |
//! | `release`     | `reserved >= n`                | `reserved -= n`               |
//! | `confirm`     | `reserved >= n`                | `reserved -= n; quantity -= n`|
//! | `restock`     | none                           | `quantity += n`               |
//! | `withdraw`    | `quantity - reserved >= n`     | `quantity -= n`               |
//! | `delete`      | `reserved == 0`                | record removed                |
//!
//! A guard that does not hold (or a missing record) yields `Ok(false)`; the
//! caller decides how to report it.
//!
//! # Reservation writes
//!
//! A reservation and its lines change together through
//! [`ReservationStore::save`] and [`ReservationStore::delete`]. Both are
//! conditional on the version the caller loaded, so of two requests that
//! read the same version only one can write.

use crate::diff::DetailChanges;
use crate::error::{NotifyError, StoreError};
use crate::types::{
    CustomerId, DetailId, Page, Product, ProductId, Reservation, ReservationCreated,
    ReservationDetail, ReservationFilter, ReservationId, Stock, StockId,
};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Per-product stock counters with atomic conditional updates.
pub trait StockLedger: Send + Sync {
    /// Creates a stock record with `quantity` physical units and nothing reserved.
    fn create(&self, quantity: u32) -> StoreFuture<'_, Stock>;

    /// Reads a stock record.
    fn get(&self, id: StockId) -> StoreFuture<'_, Option<Stock>>;

    /// Deletes a stock record iff nothing is reserved against it.
    ///
    /// Returns `false` while units are held. Deleting a missing record
    /// returns `true`.
    fn delete(&self, id: StockId) -> StoreFuture<'_, bool>;

    /// `reserved += amount` iff `quantity - reserved >= amount`.
    fn try_reserve(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool>;

    /// `reserved -= amount` iff `reserved >= amount`.
    fn release(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool>;

    /// `reserved -= amount` and `quantity -= amount` iff `reserved >= amount`.
    fn confirm(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool>;

    /// `quantity += amount`. Returns `false` only when the record is missing.
    fn restock(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool>;

    /// `quantity -= amount` iff `quantity - reserved >= amount`.
    ///
    /// The inverse of [`StockLedger::restock`].
    fn withdraw(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool>;
}

/// Read access to products plus the lifecycle writes used by the catalog.
pub trait ProductCatalog: Send + Sync {
    /// Stores a new product.
    fn insert(&self, product: Product) -> StoreFuture<'_, ()>;

    /// Reads one product.
    fn get(&self, id: ProductId) -> StoreFuture<'_, Option<Product>>;

    /// Reads several products. Missing ids are omitted; order is unspecified.
    fn get_many(&self, ids: Vec<ProductId>) -> StoreFuture<'_, Vec<Product>>;

    /// Deletes a product. Deleting a missing product is not an error.
    fn delete(&self, id: ProductId) -> StoreFuture<'_, ()>;
}

/// Reservation line storage.
pub trait DetailStore: Send + Sync {
    /// Stores new lines.
    fn insert_many(&self, details: Vec<ReservationDetail>) -> StoreFuture<'_, ()>;

    /// Reads lines, returned in the order of `ids`. Missing ids are omitted.
    fn get_many(&self, ids: Vec<DetailId>) -> StoreFuture<'_, Vec<ReservationDetail>>;

    /// Overwrites an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the line does not exist.
    fn update(&self, detail: ReservationDetail) -> StoreFuture<'_, ()>;

    /// Deletes lines. Missing ids are ignored.
    fn delete_many(&self, ids: Vec<DetailId>) -> StoreFuture<'_, ()>;
}

/// One conditional reservation write with its line changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationWrite {
    /// New state of the aggregate, `version` already bumped
    pub reservation: Reservation,
    /// Version the caller loaded
    pub expected_version: u64,
    /// Lines to delete
    pub delete: Vec<DetailId>,
    /// Lines to overwrite
    pub update: Vec<ReservationDetail>,
    /// Lines to create
    pub insert: Vec<ReservationDetail>,
}

impl ReservationWrite {
    /// Saves `reservation` over `expected_version`, bumping its version.
    #[must_use]
    pub fn new(mut reservation: Reservation, expected_version: u64) -> Self {
        reservation.version = expected_version + 1;
        Self {
            reservation,
            expected_version,
            delete: Vec::new(),
            update: Vec::new(),
            insert: Vec::new(),
        }
    }

    /// Adds the line writes of a materialised plan.
    #[must_use]
    pub fn with_lines(mut self, changes: DetailChanges) -> Self {
        self.delete = changes.delete;
        self.update = changes.update;
        self.insert = changes.insert;
        self
    }
}

/// Reservation aggregate storage.
pub trait ReservationStore: Send + Sync {
    /// Stores a new reservation.
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, ()>;

    /// Reads one reservation.
    fn get(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>>;

    /// Applies line writes and overwrites the reservation, atomically.
    ///
    /// Nothing is written and `false` is returned when the stored version is
    /// not `write.expected_version` or the reservation no longer exists.
    fn save(&self, write: ReservationWrite) -> StoreFuture<'_, bool>;

    /// Deletes a reservation and its lines iff its stored version is
    /// `expected_version`. Returns whether anything was deleted.
    fn delete(&self, id: ReservationId, expected_version: u64) -> StoreFuture<'_, bool>;

    /// Lists reservations matching `filter`, newest first.
    ///
    /// `page = None` returns every match.
    fn list(
        &self,
        filter: ReservationFilter,
        page: Option<Page>,
    ) -> StoreFuture<'_, Vec<Reservation>>;
}

/// Customer lookups needed by the notification hook.
pub trait CustomerDirectory: Send + Sync {
    /// Display name of a customer, if known.
    fn display_name(&self, customer: CustomerId) -> StoreFuture<'_, Option<String>>;
}

/// Outbound "reservation created" hook.
///
/// Delivery is best-effort: callers log failures and never surface them.
pub trait Notifier: Send + Sync {
    /// Delivers one event.
    fn reservation_created(
        &self,
        event: ReservationCreated,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}
