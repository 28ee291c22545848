//! In-memory backend bundle.
//!
//! The stores themselves live in `stockroom-memory`; this module wires one of
//! each together with a fixed clock and adds seeding helpers.

use crate::mocks::{FixedClock, test_clock};
use stockroom_core::{Money, Product, ProductId, Stock, StockId};
pub use stockroom_memory::{
    InMemoryCustomerDirectory, InMemoryDetailStore, InMemoryProductCatalog,
    InMemoryReservationStore, InMemoryStockLedger,
};

/// Every in-memory store, sharing one fixed clock.
///
/// `reservations` writes its lines into `details`, so failure injection on
/// `details` also fails reservation saves and deletes.
#[derive(Clone, Debug)]
pub struct InMemoryBackend {
    /// Stock counters
    pub stocks: InMemoryStockLedger,
    /// Products
    pub products: InMemoryProductCatalog,
    /// Reservation lines
    pub details: InMemoryDetailStore,
    /// Reservation aggregates
    pub reservations: InMemoryReservationStore,
    /// Customer names
    pub customers: InMemoryCustomerDirectory,
    /// Timestamp source
    pub clock: FixedClock,
}

impl InMemoryBackend {
    /// Create an empty backend with [`test_clock`]
    #[must_use]
    pub fn new() -> Self {
        let details = InMemoryDetailStore::new();
        Self {
            stocks: InMemoryStockLedger::new(),
            products: InMemoryProductCatalog::new(),
            reservations: InMemoryReservationStore::with_details(details.clone()),
            details,
            customers: InMemoryCustomerDirectory::new(),
            clock: test_clock(),
        }
    }

    /// Seed a product with `quantity` units in stock and nothing reserved.
    pub fn add_product(&self, name: &str, price_cents: i64, quantity: u32) -> Product {
        let stock = Stock::new(StockId::new(), quantity);
        self.stocks.insert(stock);
        let product = Product {
            id: ProductId::new(),
            code: name.to_uppercase().replace(' ', "-"),
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            stock: stock.id,
        };
        self.products.put(product.clone());
        product
    }

    /// Current counters of a product's stock.
    ///
    /// # Panics
    ///
    /// If the product's stock record was deleted.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn stock_of(&self, product: &Product) -> Stock {
        self.stocks.snapshot(product.stock).unwrap()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use stockroom_core::environment::Clock;
    use stockroom_core::store::{DetailStore, ReservationStore};
    use stockroom_core::{
        CustomerId, DetailId, Reservation, ReservationDetail, ReservationId, ReservationStatus,
    };

    #[test]
    fn seeded_products_start_unreserved() {
        let backend = InMemoryBackend::new();
        let gadget = backend.add_product("Blue gadget", 250, 4);

        assert_eq!(gadget.code, "BLUE-GADGET");
        let stock = backend.stock_of(&gadget);
        assert_eq!((stock.quantity, stock.reserved), (4, 0));
    }

    #[tokio::test]
    async fn reservation_deletes_clear_the_shared_line_store() {
        let backend = InMemoryBackend::new();
        let id = ReservationId::new();
        let line = ReservationDetail {
            id: DetailId::new(),
            reservation: id,
            product: ProductId::new(),
            quantity: 1,
            subtotal: Money::ZERO,
        };
        backend.details.insert_many(vec![line.clone()]).await.unwrap();
        let now = backend.clock.now();
        backend
            .reservations
            .insert(Reservation {
                id,
                customer: CustomerId::new(),
                status: ReservationStatus::Pending,
                total: Money::ZERO,
                details: vec![line.id],
                created_at: now,
                updated_at: now,
                version: 1,
            })
            .await
            .unwrap();

        assert!(backend.reservations.delete(id, 1).await.unwrap());
        assert!(!backend.details.contains(line.id));
    }
}
