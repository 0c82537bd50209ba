//! Command implementations.
//!
//! Each command loads state from the data directory, does one thing and
//! writes its result to stdout. Logs go to stderr.

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod tags;

use std::sync::Arc;

use geomancy_storefront::baas::BaasClient;
use geomancy_storefront::storage::{FileStorage, KeyValueStore};
use geomancy_storefront::{Cart, ProductCatalog, RestOrderStore, StorefrontConfig};

/// Configuration and storage shared by all commands.
pub struct Context {
    pub config: StorefrontConfig,
    pub baas: BaasClient,
    pub local: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
}

impl Context {
    /// Load configuration and open the storage files.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = StorefrontConfig::from_env()?;
        let baas = BaasClient::new(&config.baas)?;
        let local = Arc::new(FileStorage::new(config.local_storage_path()));
        let session = Arc::new(FileStorage::new(config.session_storage_path()));
        Ok(Self {
            config,
            baas,
            local,
            session,
        })
    }

    pub fn cart(&self) -> Cart {
        Cart::load(Arc::clone(&self.local))
    }

    pub fn orders(&self) -> RestOrderStore {
        RestOrderStore::new(self.baas.clone())
    }

    pub fn catalog(&self) -> ProductCatalog {
        ProductCatalog::new(self.baas.clone(), self.config.catalog_cache_ttl)
    }
}
