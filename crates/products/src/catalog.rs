//! Thread-safe product catalog, keyed by product id.

use std::collections::HashMap;
use std::sync::RwLock;

use wareflow_core::{DomainError, DomainResult, ProductId};

use crate::product::Product;

/// Concurrent map of product id → catalog entry.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) -> DomainResult<()> {
        let mut map = self.inner.write().expect("product catalog poisoned");
        let id = product.id_typed();
        if map.contains_key(&id) {
            return Err(DomainError::conflict(format!("product {id} already exists")));
        }
        map.insert(id, product);
        Ok(())
    }

    pub fn get(&self, id: ProductId) -> DomainResult<Product> {
        let map = self.inner.read().expect("product catalog poisoned");
        map.get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    pub fn contains(&self, id: ProductId) -> bool {
        let map = self.inner.read().expect("product catalog poisoned");
        map.contains_key(&id)
    }
}
