//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::gateway::{GatewayError, PaystackClient};

/// Relay state shared across all handlers.
///
/// Immutable after start-up and cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,
    gateway: PaystackClient,
}

impl AppState {
    /// Create the relay state, building the gateway client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, GatewayError> {
        let gateway = PaystackClient::new(&config.gateway)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, gateway }),
        })
    }

    /// Get a reference to the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn gateway(&self) -> &PaystackClient {
        &self.inner.gateway
    }
}
