//! Payment gateway (Paystack) integration.
//!
//! The relay is the only component holding the gateway secret key. The
//! client injects it as a bearer token on every request.

mod client;
pub mod types;

pub use client::PaystackClient;
pub use types::{InitializeData, VerifiedTransaction};

use thiserror::Error;

/// Errors that can occur when calling the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (connection, timeout, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Gateway answered 2xx but flagged the call as failed in its envelope.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Gateway response did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The configured secret key cannot be sent as a header.
    #[error("Invalid gateway credential")]
    InvalidCredential,
}

impl GatewayError {
    /// Whether the gateway itself refused the request (a 4xx or an envelope
    /// rejection) as opposed to a transport or server failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status >= 400 && *status < 500,
            Self::Rejected(_) => true,
            Self::Http(_) | Self::MalformedResponse(_) | Self::InvalidCredential => false,
        }
    }
}
