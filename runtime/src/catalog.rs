//! Product lifecycle, limited to its stock effects.

use std::sync::Arc;
use stockroom_core::store::{ProductCatalog, StockLedger};
use stockroom_core::validation;
use stockroom_core::{NewProduct, Product, ProductId, ReservationError, StockLevel};

/// Creates and deletes products together with their stock records.
#[derive(Clone)]
pub struct CatalogService {
    stocks: Arc<dyn StockLedger>,
    products: Arc<dyn ProductCatalog>,
}

impl CatalogService {
    /// Creates the service.
    #[must_use]
    pub fn new(stocks: Arc<dyn StockLedger>, products: Arc<dyn ProductCatalog>) -> Self {
        Self { stocks, products }
    }

    /// Seeds a stock record with `initial_quantity` and creates the product
    /// pointing at it.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Validation`] for a negative price, or
    /// [`ReservationError::Store`] on persistence failure.
    #[tracing::instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_product(&self, request: NewProduct) -> Result<Product, ReservationError> {
        let price = validation::price(request.price)?;
        let stock = self.stocks.create(request.initial_quantity).await?;

        let product = Product {
            id: ProductId::new(),
            code: request.code,
            name: request.name,
            price,
            stock: stock.id,
        };
        if let Err(e) = self.products.insert(product.clone()).await {
            if let Err(cleanup) = self.stocks.delete(stock.id).await {
                tracing::error!(stock = %stock.id, error = %cleanup, "Failed to delete orphaned stock record");
            }
            return Err(e.into());
        }

        tracing::info!(product = %product.id, quantity = request.initial_quantity, "Product created");
        Ok(product)
    }

    /// Deletes a product's stock record and then the product.
    ///
    /// Refused while any units of the product are held, so a pending
    /// reservation never points at a product that no longer exists.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::ProductNotFound`]
    /// - [`ReservationError::ProductInUse`] while units are reserved
    /// - [`ReservationError::Store`] on persistence failure
    #[tracing::instrument(skip(self), fields(product = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ReservationError> {
        let product = self
            .products
            .get(id)
            .await?
            .ok_or(ReservationError::ProductNotFound(id))?;

        if !self.stocks.delete(product.stock).await? {
            let reserved = self
                .stocks
                .get(product.stock)
                .await?
                .map_or(0, |stock| stock.reserved);
            tracing::warn!(reserved, "Product deletion refused while stock is held");
            return Err(ReservationError::ProductInUse {
                product: id,
                reserved,
            });
        }
        self.products.delete(id).await?;
        tracing::info!("Product deleted");
        Ok(())
    }

    /// Current counters of a product's stock.
    ///
    /// # Errors
    ///
    /// [`ReservationError::ProductNotFound`], [`ReservationError::StockNotFound`]
    /// or [`ReservationError::Store`].
    pub async fn stock_for(&self, id: ProductId) -> Result<StockLevel, ReservationError> {
        let product = self
            .products
            .get(id)
            .await?
            .ok_or(ReservationError::ProductNotFound(id))?;
        let stock = self
            .stocks
            .get(product.stock)
            .await?
            .ok_or(ReservationError::StockNotFound(product.stock))?;
        Ok(StockLevel::of(id, &stock))
    }
}
