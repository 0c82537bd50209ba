//! Status enums for orders and payment verification.

use serde::{Deserialize, Serialize};

/// A status string that does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

impl StatusParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Payment status of an order.
///
/// An order is created as `PendingPayment` and moves at most once to
/// `Completed` (payment verified) or `Failed` (payment never started).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Completed,
    Failed,
}

impl OrderStatus {
    /// Whether the status can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether an order in this status may be patched to `to`.
    #[must_use]
    pub fn can_become(self, to: Self) -> bool {
        !self.is_terminal() || self == to
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingPayment => write!(f, "PendingPayment"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            _ => Err(StatusParseError::new("order status", s)),
        }
    }
}

/// Fulfilment progress set by an administrator after payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    OrderPlaced,
    Processing,
    Shipped,
    Delivered,
}

impl FulfillmentStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::Processing => "Processing...",
            Self::Shipped => "Item(s) Shipped",
            Self::Delivered => "Item(s) Delivered",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderPlaced => write!(f, "order_placed"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_placed" => Ok(Self::OrderPlaced),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            _ => Err(StatusParseError::new("fulfillment status", s)),
        }
    }
}

/// Outcome of verifying a transaction with the payment gateway.
///
/// Any gateway status other than `success` (abandoned, reversed, ongoing)
/// counts as `Failed` for checkout purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Success,
    Failed,
}

impl VerificationStatus {
    /// Map a raw gateway transaction status.
    #[must_use]
    pub fn from_gateway(status: &str) -> Self {
        if status.eq_ignore_ascii_case("success") {
            Self::Success
        } else {
            Self::Failed
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
