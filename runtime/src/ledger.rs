//! Guarded stock operations and compensation.
//!
//! [`Ledger`] turns the boolean outcomes of [`StockLedger`] writes into the
//! reservation error taxonomy. [`LedgerJournal`] records every write a
//! request makes so it can be undone, in reverse order, when a later step of
//! the same request fails.

use crate::metrics::ReservationMetrics;
use std::sync::Arc;
use stockroom_core::store::StockLedger;
use stockroom_core::{Product, ReservationError, StockEffect, StockId};

/// Stock ledger with error mapping.
#[derive(Clone)]
pub struct Ledger {
    stocks: Arc<dyn StockLedger>,
}

impl Ledger {
    /// Wraps a ledger store.
    #[must_use]
    pub fn new(stocks: Arc<dyn StockLedger>) -> Self {
        Self { stocks }
    }

    /// The underlying store.
    #[must_use]
    pub fn stocks(&self) -> &Arc<dyn StockLedger> {
        &self.stocks
    }

    /// Holds `amount` units of `product`.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InsufficientStock`] with the availability read
    ///   right after the rejected write
    /// - [`ReservationError::StockNotFound`] if the stock record is missing
    /// - [`ReservationError::Store`] on persistence failure
    pub async fn reserve(&self, product: &Product, amount: u32) -> Result<(), ReservationError> {
        if amount == 0 || self.stocks.try_reserve(product.stock, amount).await? {
            return Ok(());
        }
        match self.stocks.get(product.stock).await? {
            Some(stock) => {
                ReservationMetrics::record_stock_rejection();
                Err(ReservationError::InsufficientStock {
                    product: product.id,
                    product_name: product.name.clone(),
                    requested: amount,
                    available: stock.available(),
                })
            }
            None => Err(ReservationError::StockNotFound(product.stock)),
        }
    }

    /// Drops a hold of `amount` units.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InsufficientHold`] if fewer units are held
    /// - [`ReservationError::StockNotFound`] if the stock record is missing
    /// - [`ReservationError::Store`] on persistence failure
    pub async fn release(&self, stock: StockId, amount: u32) -> Result<(), ReservationError> {
        if amount == 0 || self.stocks.release(stock, amount).await? {
            return Ok(());
        }
        Err(self.hold_shortfall(stock, amount).await)
    }

    /// Converts a hold of `amount` units into a physical deduction.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::release`].
    pub async fn confirm(&self, stock: StockId, amount: u32) -> Result<(), ReservationError> {
        if amount == 0 || self.stocks.confirm(stock, amount).await? {
            return Ok(());
        }
        Err(self.hold_shortfall(stock, amount).await)
    }

    /// Adds `amount` units back to physical quantity.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::StockNotFound`] if the stock record is missing
    /// - [`ReservationError::Store`] on persistence failure
    pub async fn restock(&self, stock: StockId, amount: u32) -> Result<(), ReservationError> {
        if amount == 0 || self.stocks.restock(stock, amount).await? {
            return Ok(());
        }
        Err(ReservationError::StockNotFound(stock))
    }

    /// Applies a status-driven effect to one stock record.
    ///
    /// # Errors
    ///
    /// Whatever the selected operation returns.
    pub async fn apply(
        &self,
        effect: StockEffect,
        stock: StockId,
        amount: u32,
    ) -> Result<(), ReservationError> {
        match effect {
            StockEffect::None => Ok(()),
            StockEffect::Confirm => self.confirm(stock, amount).await,
            StockEffect::Release => self.release(stock, amount).await,
            StockEffect::Restock => self.restock(stock, amount).await,
        }
    }

    async fn hold_shortfall(&self, stock: StockId, requested: u32) -> ReservationError {
        match self.stocks.get(stock).await {
            Ok(Some(record)) => {
                tracing::error!(
                    stock = %stock,
                    requested,
                    held = record.reserved,
                    "Ledger invariant violated: hold smaller than requested amount"
                );
                ReservationError::InsufficientHold {
                    stock,
                    requested,
                    held: record.reserved,
                }
            }
            Ok(None) => ReservationError::StockNotFound(stock),
            Err(e) => e.into(),
        }
    }
}

// ============================================================================
// Journal
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entry {
    Reserved { stock: StockId, amount: u32 },
    Released { stock: StockId, amount: u32 },
    Confirmed { stock: StockId, amount: u32 },
    Restocked { stock: StockId, amount: u32 },
}

/// Ledger writes made by one request, undoable in reverse order.
///
/// Call [`LedgerJournal::commit`] once the request has fully succeeded, or
/// [`LedgerJournal::unwind`] to compensate after a failure.
pub struct LedgerJournal<'a> {
    ledger: &'a Ledger,
    entries: Vec<Entry>,
}

impl<'a> LedgerJournal<'a> {
    /// Starts an empty journal.
    #[must_use]
    pub const fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            entries: Vec::new(),
        }
    }

    /// Number of recorded writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// [`Ledger::reserve`], recorded on success.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::reserve`].
    pub async fn reserve(&mut self, product: &Product, amount: u32) -> Result<(), ReservationError> {
        self.ledger.reserve(product, amount).await?;
        self.entries.push(Entry::Reserved {
            stock: product.stock,
            amount,
        });
        Ok(())
    }

    /// [`Ledger::release`], recorded on success.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::release`].
    pub async fn release(&mut self, stock: StockId, amount: u32) -> Result<(), ReservationError> {
        self.ledger.release(stock, amount).await?;
        self.entries.push(Entry::Released { stock, amount });
        Ok(())
    }

    /// [`Ledger::confirm`], recorded on success.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::confirm`].
    pub async fn confirm(&mut self, stock: StockId, amount: u32) -> Result<(), ReservationError> {
        self.ledger.confirm(stock, amount).await?;
        self.entries.push(Entry::Confirmed { stock, amount });
        Ok(())
    }

    /// [`Ledger::restock`], recorded on success.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::restock`].
    pub async fn restock(&mut self, stock: StockId, amount: u32) -> Result<(), ReservationError> {
        self.ledger.restock(stock, amount).await?;
        self.entries.push(Entry::Restocked { stock, amount });
        Ok(())
    }

    /// Applies a transition effect through the journal.
    ///
    /// # Errors
    ///
    /// Whatever the selected operation returns.
    pub async fn apply(
        &mut self,
        effect: StockEffect,
        stock: StockId,
        amount: u32,
    ) -> Result<(), ReservationError> {
        match effect {
            StockEffect::None => Ok(()),
            StockEffect::Confirm => self.confirm(stock, amount).await,
            StockEffect::Release => self.release(stock, amount).await,
            StockEffect::Restock => self.restock(stock, amount).await,
        }
    }

    /// Forgets the recorded writes; they are now permanent.
    pub fn commit(self) {
        if !self.entries.is_empty() {
            tracing::trace!(writes = self.entries.len(), "Ledger journal committed");
        }
    }

    /// Undoes every recorded write, newest first.
    ///
    /// Compensation is best-effort: a compensating write that fails is logged
    /// and the unwind continues. Returns the number of writes that could not
    /// be undone.
    pub async fn unwind(self) -> usize {
        let mut failed = 0;
        for entry in self.entries.iter().rev() {
            let undone = self.undo(*entry).await;
            ReservationMetrics::record_compensation(undone);
            if !undone {
                failed += 1;
            }
        }
        if !self.entries.is_empty() {
            tracing::warn!(
                writes = self.entries.len(),
                failed,
                "Unwound ledger writes after failed request"
            );
        }
        failed
    }

    async fn undo(&self, entry: Entry) -> bool {
        let stocks = self.ledger.stocks();
        let outcome = match entry {
            Entry::Reserved { stock, amount } => stocks.release(stock, amount).await,
            Entry::Released { stock, amount } => stocks.try_reserve(stock, amount).await,
            Entry::Confirmed { stock, amount } => match stocks.restock(stock, amount).await {
                Ok(true) => stocks.try_reserve(stock, amount).await,
                other => other,
            },
            Entry::Restocked { stock, amount } => stocks.withdraw(stock, amount).await,
        };
        match outcome {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(?entry, "Compensating ledger write was rejected");
                false
            }
            Err(e) => {
                tracing::error!(?entry, error = %e, "Compensating ledger write failed");
                false
            }
        }
    }
}
