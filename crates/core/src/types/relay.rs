//! Wire types for the payment relay's HTTP surface.
//!
//! Shared by the relay server and the storefront's relay client so both
//! ends agree on field names. Prices are minor units.

use serde::{Deserialize, Serialize};

use super::id::TransactionReference;
use super::money::MinorUnits;
use super::order::ShippingAddress;

/// One priced line in an initialization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayLineItem {
    pub price: MinorUnits,
    pub qty: u32,
}

/// Body of `POST /initialize-transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeTransactionRequest {
    #[serde(default)]
    pub items: Option<Vec<RelayLineItem>>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Successful response of `POST /initialize-transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeTransactionResponse {
    pub authorization_url: String,
    pub reference: TransactionReference,
}

/// Response of `GET /verify-transaction` (200 and 400).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyTransactionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
}
