//! Products and the customer directory.

use crate::{PostgresStore, database, decode};
use sqlx::Row;
use stockroom_core::store::{CustomerDirectory, ProductCatalog, StoreFuture};
use stockroom_core::{CustomerId, Money, Product, ProductId, StockId, StoreError};
use uuid::Uuid;

fn row_to_product(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode)?;
    let stock: Uuid = row.try_get("stock_id").map_err(decode)?;
    let price: i64 = row.try_get("price_cents").map_err(decode)?;
    Ok(Product {
        id: ProductId::from_uuid(id),
        code: row.try_get("code").map_err(decode)?,
        name: row.try_get("name").map_err(decode)?,
        price: Money::from_cents(price),
        stock: StockId::from_uuid(stock),
    })
}

impl ProductCatalog for PostgresStore {
    fn insert(&self, product: Product) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO products (id, code, name, price_cents, stock_id)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(product.id.as_uuid())
            .bind(&product.code)
            .bind(&product.name)
            .bind(product.price.cents())
            .bind(product.stock.as_uuid())
            .execute(self.pool())
            .await
            .map_err(database)?;
            Ok(())
        })
    }

    fn get(&self, id: ProductId) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, code, name, price_cents, stock_id FROM products WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(database)?;
            row.as_ref().map(row_to_product).transpose()
        })
    }

    fn get_many(&self, ids: Vec<ProductId>) -> StoreFuture<'_, Vec<Product>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
            let rows = sqlx::query(
                "SELECT id, code, name, price_cents, stock_id FROM products WHERE id = ANY($1)",
            )
            .bind(&ids)
            .fetch_all(self.pool())
            .await
            .map_err(database)?;
            rows.iter().map(row_to_product).collect()
        })
    }

    fn delete(&self, id: ProductId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .execute(self.pool())
                .await
                .map_err(database)?;
            Ok(())
        })
    }
}

impl CustomerDirectory for PostgresStore {
    fn display_name(&self, customer: CustomerId) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let name: Option<(String,)> = sqlx::query_as("SELECT name FROM customers WHERE id = $1")
                .bind(customer.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(database)?;
            Ok(name.map(|(name,)| name))
        })
    }
}
