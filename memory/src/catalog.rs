//! Products and customer names.

use crate::{read, write};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use stockroom_core::store::{CustomerDirectory, ProductCatalog, StoreFuture};
use stockroom_core::{CustomerId, Product, ProductId};

/// In-memory product catalog.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product directly
    pub fn put(&self, product: Product) {
        write(&self.products).insert(product.id, product);
    }

    /// Number of products
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.products).len()
    }

    /// Check if the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.products).is_empty()
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn insert(&self, product: Product) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.put(product);
            Ok(())
        })
    }

    fn get(&self, id: ProductId) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move { Ok(read(&self.products).get(&id).cloned()) })
    }

    fn get_many(&self, ids: Vec<ProductId>) -> StoreFuture<'_, Vec<Product>> {
        Box::pin(async move {
            let products = read(&self.products);
            Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
        })
    }

    fn delete(&self, id: ProductId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            write(&self.products).remove(&id);
            Ok(())
        })
    }
}

/// In-memory customer directory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCustomerDirectory {
    names: Arc<RwLock<HashMap<CustomerId, String>>>,
}

impl InMemoryCustomerDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer's display name
    pub fn insert(&self, customer: CustomerId, name: impl Into<String>) {
        write(&self.names).insert(customer, name.into());
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn display_name(&self, customer: CustomerId) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move { Ok(read(&self.names).get(&customer).cloned()) })
    }
}
