//! Stock counters as single-statement conditional updates.

use crate::{PostgresStore, count, database};
use stockroom_core::store::{StockLedger, StoreFuture};
use stockroom_core::{Stock, StockId, StoreError};

const TRY_RESERVE: &str = r"
    UPDATE stocks SET reserved = reserved + $2
    WHERE id = $1 AND quantity - reserved >= $2
";

const RELEASE: &str = r"
    UPDATE stocks SET reserved = reserved - $2
    WHERE id = $1 AND reserved >= $2
";

const CONFIRM: &str = r"
    UPDATE stocks SET reserved = reserved - $2, quantity = quantity - $2
    WHERE id = $1 AND reserved >= $2
";

const RESTOCK: &str = r"
    UPDATE stocks SET quantity = quantity + $2
    WHERE id = $1
";

const WITHDRAW: &str = r"
    UPDATE stocks SET quantity = quantity - $2
    WHERE id = $1 AND quantity - reserved >= $2
";

impl PostgresStore {
    /// Runs one guarded update; `true` iff exactly one row matched.
    async fn guarded(&self, sql: &str, id: StockId, amount: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(sql)
            .bind(id.as_uuid())
            .bind(i64::from(amount))
            .execute(self.pool())
            .await
            .map_err(database)?;
        Ok(result.rows_affected() == 1)
    }
}

fn row_to_stock(row: &sqlx::postgres::PgRow) -> Result<Stock, StoreError> {
    use sqlx::Row;

    let id: uuid::Uuid = row.try_get("id").map_err(crate::decode)?;
    Ok(Stock {
        id: StockId::from_uuid(id),
        quantity: count(row, "quantity")?,
        reserved: count(row, "reserved")?,
    })
}

impl StockLedger for PostgresStore {
    fn create(&self, quantity: u32) -> StoreFuture<'_, Stock> {
        Box::pin(async move {
            let stock = Stock::new(StockId::new(), quantity);
            sqlx::query("INSERT INTO stocks (id, quantity, reserved) VALUES ($1, $2, 0)")
                .bind(stock.id.as_uuid())
                .bind(i64::from(quantity))
                .execute(self.pool())
                .await
                .map_err(database)?;
            Ok(stock)
        })
    }

    fn get(&self, id: StockId) -> StoreFuture<'_, Option<Stock>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT id, quantity, reserved FROM stocks WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(database)?;
            row.as_ref().map(row_to_stock).transpose()
        })
    }

    fn delete(&self, id: StockId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM stocks WHERE id = $1 AND reserved = 0")
                .bind(id.as_uuid())
                .execute(self.pool())
                .await
                .map_err(database)?;
            if result.rows_affected() == 1 {
                return Ok(true);
            }
            // Nothing deleted: either held or already gone.
            let held = sqlx::query("SELECT 1 FROM stocks WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(database)?;
            Ok(held.is_none())
        })
    }

    fn try_reserve(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(self.guarded(TRY_RESERVE, id, amount))
    }

    fn release(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(self.guarded(RELEASE, id, amount))
    }

    fn confirm(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(self.guarded(CONFIRM, id, amount))
    }

    fn restock(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(self.guarded(RESTOCK, id, amount))
    }

    fn withdraw(&self, id: StockId, amount: u32) -> StoreFuture<'_, bool> {
        Box::pin(self.guarded(WITHDRAW, id, amount))
    }
}
