//! Stock counters guarded by one write lock.

use crate::{read, write};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use stockroom_core::store::{StockLedger, StoreFuture};
use stockroom_core::{Stock, StockId};
use tokio::task::yield_now;

/// In-memory stock ledger.
///
/// Each operation yields to the scheduler first so concurrent requests
/// actually interleave.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStockLedger {
    stocks: Arc<RwLock<HashMap<StockId, Stock>>>,
}

impl InMemoryStockLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or overwrite) a stock record directly, bypassing the guards
    pub fn insert(&self, stock: Stock) {
        write(&self.stocks).insert(stock.id, stock);
    }

    /// Current counters of one record
    #[must_use]
    pub fn snapshot(&self, id: StockId) -> Option<Stock> {
        read(&self.stocks).get(&id).copied()
    }

    /// Every record
    #[must_use]
    pub fn all(&self) -> Vec<Stock> {
        read(&self.stocks).values().copied().collect()
    }

    fn update_if(&self, id: StockId, apply: impl FnOnce(&mut Stock) -> bool) -> bool {
        write(&self.stocks).get_mut(&id).is_some_and(apply)
    }
}

impl StockLedger for InMemoryStockLedger {
    fn create(&self, quantity: u32) -> StoreFuture<'_, Stock> {
        Box::pin(async move {
            yield_now().await;
            let stock = Stock::new(StockId::new(), quantity);
            self.insert(stock);
            Ok(stock)
        })
    }

    fn get(&self, id: StockId) -> StoreFuture<'_, Option<Stock>> {
        Box::pin(async move {
            yield_now().await;
            Ok(self.snapshot(id))
        })
    }

    fn delete(&self, id: StockId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            let mut stocks = write(&self.stocks);
            match stocks.get(&id) {
                Some(stock) if stock.reserved > 0 => Ok(false),
                _ => {
                    stocks.remove(&id);
                    Ok(true)
                }
            }
        })
    }

    fn try_reserve(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            Ok(self.update_if(id, |s| {
                if s.available() >= amount {
                    s.reserved += amount;
                    true
                } else {
                    false
                }
            }))
        })
    }

    fn release(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            Ok(self.update_if(id, |s| {
                if s.reserved >= amount {
                    s.reserved -= amount;
                    true
                } else {
                    false
                }
            }))
        })
    }

    fn confirm(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            Ok(self.update_if(id, |s| {
                if s.reserved >= amount && s.quantity >= amount {
                    s.reserved -= amount;
                    s.quantity -= amount;
                    true
                } else {
                    false
                }
            }))
        })
    }

    fn restock(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            Ok(self.update_if(id, |s| {
                s.quantity = s.quantity.saturating_add(amount);
                true
            }))
        })
    }

    fn withdraw(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            yield_now().await;
            Ok(self.update_if(id, |s| {
                if s.available() >= amount {
                    s.quantity -= amount;
                    true
                } else {
                    false
                }
            }))
        })
    }
}
