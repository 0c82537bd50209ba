//! Geomancy Shop storefront library.
//!
//! Everything the shop's browser client does, minus the rendering: the
//! persisted cart, the product catalog, the order store on the hosted BaaS,
//! the client for the payment relay and the checkout state machine that ties
//! them together across the payment redirect.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod baas;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod cycler;
pub mod error;
pub mod feed;
pub mod orders;
pub mod relay_client;
pub mod storage;

pub use cart::Cart;
pub use catalog::ProductCatalog;
pub use checkout::{Checkout, CheckoutRequest, CheckoutState};
pub use config::StorefrontConfig;
pub use error::CheckoutError;
pub use orders::{OrderStore, RestOrderStore};
pub use relay_client::{PaymentRelay, RelayClient};
