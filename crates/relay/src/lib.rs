//! Geomancy Shop payment relay.
//!
//! The only server-side component of the shop. It forwards transaction
//! initialization and verification to the payment gateway, injecting the
//! secret key the browser must never see. It keeps no state between
//! requests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::RelayConfig;
pub use error::RelayError;
pub use routes::app;
pub use state::AppState;
