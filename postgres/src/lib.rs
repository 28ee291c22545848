//! `PostgreSQL` backend for the stockroom store traits.
//!
//! [`PostgresStore`] implements every persistence trait from
//! `stockroom-core` on top of one `sqlx` connection pool:
//!
//! - [`StockLedger`](stockroom_core::store::StockLedger): each guarded write is
//!   a single conditional `UPDATE`; `rows_affected() == 1` is the outcome
//! - [`ProductCatalog`](stockroom_core::store::ProductCatalog)
//! - [`DetailStore`](stockroom_core::store::DetailStore)
//! - [`ReservationStore`](stockroom_core::store::ReservationStore)
//! - [`CustomerDirectory`](stockroom_core::store::CustomerDirectory)
//!
//! # Example
//!
//! ```ignore
//! use stockroom_postgres::{PoolSettings, PostgresStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/stockroom", PoolSettings::default()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod ledger;
mod reservations;
pub mod schema;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use stockroom_core::StoreError;

/// Connection pool sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a connection before failing
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// All stockroom stores backed by one `PostgreSQL` pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be established.
    pub async fn connect(database_url: &str, settings: PoolSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the tables and indexes if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        }
        tracing::info!(statements = schema::STATEMENTS.len(), "Schema is up to date");
        Ok(())
    }

    /// Inserts or renames a customer.
    ///
    /// Customers are owned elsewhere; the directory only mirrors display names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    pub async fn put_customer(
        &self,
        customer: stockroom_core::CustomerId,
        name: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO customers (id, name) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            ",
        )
        .bind(customer.as_uuid())
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(database)?;
        Ok(())
    }
}

fn database(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn decode(e: sqlx::Error) -> StoreError {
    StoreError::Serialization(e.to_string())
}

/// Reads a non-negative count column into `u32`.
fn count(row: &sqlx::postgres::PgRow, column: &str) -> Result<u32, StoreError> {
    use sqlx::Row;

    let value: i64 = row.try_get(column).map_err(decode)?;
    u32::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("{column} out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_settings() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_connections, 10);
        assert_eq!(settings.min_connections, 2);
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
    }
}
