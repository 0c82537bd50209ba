//! Read-only product catalog backed by the BaaS `products` table.
//!
//! Responses are cached in memory with `moka` for the configured TTL
//! (5 minutes by default).

use std::sync::Arc;
use std::time::Duration;

use geomancy_core::{Product, ProductId};
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::baas::{BaasClient, BaasError, eq_filter};

const TABLE: &str = "products";

/// Errors reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Baas(#[from] BaasError),

    #[error("product not found: {0}")]
    NotFound(ProductId),
}

/// Cache key for product queries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    All,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// Product catalog with a TTL cache in front of the BaaS.
#[derive(Clone)]
pub struct ProductCatalog {
    inner: Arc<ProductCatalogInner>,
}

struct ProductCatalogInner {
    baas: BaasClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl ProductCatalog {
    #[must_use]
    pub fn new(baas: BaasClient, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(ProductCatalogInner { baas, cache }),
        }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the BaaS request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::All).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Arc<Vec<Product>> = Arc::new(
            self.inner
                .baas
                .select(TABLE, "select=*&order=createdAt.desc")
                .await?,
        );

        self.inner
            .cache
            .insert(CacheKey::All, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no product has this id, or an error if the BaaS
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let query = format!("select=*&{}", eq_filter("id", id.as_str()));
        let rows: Vec<Product> = self.inner.baas.select(TABLE, &query).await?;
        let product = rows
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Products in `category` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns error if the BaaS request fails.
    pub async fn by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .list()
            .await?
            .iter()
            .filter(|p| p.in_category(category))
            .cloned()
            .collect())
    }

    /// Drop every cached response.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }
}
