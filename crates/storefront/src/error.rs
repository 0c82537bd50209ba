//! Checkout error taxonomy and Sentry helpers.
//!
//! Every checkout failure ends in a halted state machine and a notification;
//! none of them is fatal to the process. [`CheckoutError::is_retryable`]
//! tells the caller whether a fresh attempt is safe.

use geomancy_core::{EmailError, OrderId, TransactionReference};
use thiserror::Error;

use crate::orders::OrderStoreError;
use crate::relay_client::RelayClientError;
use crate::storage::StorageError;

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("a checkout is already awaiting payment")]
    CheckoutInProgress,
}

/// Which gateway call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPhase {
    Initialize,
    Verify,
}

impl std::fmt::Display for GatewayPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialize => write!(f, "initialization"),
            Self::Verify => write!(f, "verification"),
        }
    }
}

/// Errors produced by the checkout orchestrator.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The order could not be saved. Nothing was charged.
    #[error("could not save order: {0}")]
    Storage(#[from] OrderStoreError),

    /// Session storage could not hold the pending order id.
    #[error("session storage failed: {0}")]
    Session(#[from] StorageError),

    #[error("payment {phase} failed: {source}")]
    Gateway {
        phase: GatewayPhase,
        #[source]
        source: RelayClientError,
    },

    /// The gateway says the transaction did not succeed.
    #[error("payment was not successful: {0}")]
    Verification(String),

    /// The payment returned but this session holds no pending order.
    #[error("no pending order for payment {reference}")]
    MissingPendingOrder { reference: TransactionReference },

    /// Payment succeeded but the order could not be marked completed.
    #[error("payment {reference} succeeded but order {order_id} was not updated: {source}")]
    Reconciliation {
        order_id: OrderId,
        reference: TransactionReference,
        #[source]
        source: OrderStoreError,
    },
}

impl CheckoutError {
    /// Whether starting a new checkout attempt is safe.
    ///
    /// Failures before the customer paid are retryable. Once money may have
    /// been captured, retrying from the client alone could double-charge or
    /// hide the gap, so those are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Session(_) => true,
            Self::Gateway { phase, .. } => matches!(phase, GatewayPhase::Initialize),
            Self::Validation(_)
            | Self::Verification(_)
            | Self::MissingPendingOrder { .. }
            | Self::Reconciliation { .. } => false,
        }
    }

    /// Message suitable for a toast notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Storage(_) | Self::Session(_) => {
                "We could not save your order. You have not been charged, please try again."
                    .to_string()
            }
            Self::Gateway {
                phase: GatewayPhase::Initialize,
                ..
            } => "We could not start the payment. You have not been charged, please try again."
                .to_string(),
            Self::Gateway {
                phase: GatewayPhase::Verify,
                ..
            } => "We could not confirm your payment. Please contact support.".to_string(),
            Self::Verification(_) => "Your payment was not successful.".to_string(),
            Self::MissingPendingOrder { reference } => format!(
                "We could not find the order for payment {reference}. Please contact support."
            ),
            Self::Reconciliation { reference, .. } => format!(
                "Your payment {reference} was received but your order could not be updated. Please contact support."
            ),
        }
    }
}

/// Add a breadcrumb for checkout progress.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(
            CheckoutError::Storage(OrderStoreError::Storage("denied".to_string())).is_retryable()
        );
        assert!(
            CheckoutError::Gateway {
                phase: GatewayPhase::Initialize,
                source: RelayClientError::Parse("eof".to_string()),
            }
            .is_retryable()
        );
        assert!(
            !CheckoutError::Gateway {
                phase: GatewayPhase::Verify,
                source: RelayClientError::Parse("eof".to_string()),
            }
            .is_retryable()
        );
        assert!(!CheckoutError::Verification("abandoned".to_string()).is_retryable());
        assert!(!CheckoutError::Validation(ValidationError::EmptyCart).is_retryable());
    }

    #[test]
    fn test_user_message_names_reference() {
        let err = CheckoutError::Reconciliation {
            order_id: OrderId::new("o1"),
            reference: TransactionReference::new("ref_123"),
            source: OrderStoreError::NotFound(OrderId::new("o1")),
        };
        assert!(err.user_message().contains("ref_123"));
        assert_eq!(
            CheckoutError::from(ValidationError::EmptyCart).user_message(),
            "your cart is empty"
        );
    }
}
