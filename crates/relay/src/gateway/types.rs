//! Paystack wire types.
//!
//! Every response shares the envelope `{status: bool, message, data}`. The
//! envelope `status` only says the API call worked; the transaction outcome
//! lives in `data.status`.

use geomancy_core::{
    CurrencyCode, MinorUnits, ShippingAddress, TransactionReference, VerificationStatus,
};
use serde::{Deserialize, Serialize};

/// Response envelope returned by every gateway endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Body of `POST /transaction/initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeRequest<'a> {
    pub email: &'a str,
    /// Minor units (pesewas, kobo).
    pub amount: MinorUnits,
    pub currency: CurrencyCode,
    pub callback_url: &'a str,
    pub metadata: TransactionMetadata<'a>,
}

/// Free-form metadata attached to a transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<&'a ShippingAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

/// `data` of a successful initialization.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    #[serde(default)]
    pub access_code: Option<String>,
    pub reference: TransactionReference,
}

/// Outcome of a verification call.
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub status: VerificationStatus,
    /// Raw `data.status` as reported by the gateway (`success`, `abandoned`, ...).
    pub gateway_status: String,
    pub reference: Option<TransactionReference>,
    pub amount: Option<MinorUnits>,
    /// Full `data` payload, passed through to the storefront.
    pub raw: serde_json::Value,
}

impl VerifiedTransaction {
    /// Interpret the `data` object of a verification response.
    #[must_use]
    pub fn from_data(data: serde_json::Value) -> Self {
        let gateway_status = data
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let reference = data
            .get("reference")
            .and_then(serde_json::Value::as_str)
            .map(TransactionReference::new);
        let amount = data
            .get("amount")
            .and_then(serde_json::Value::as_u64)
            .map(MinorUnits::new);

        Self {
            status: VerificationStatus::from_gateway(&gateway_status),
            gateway_status,
            reference,
            amount,
            raw: data,
        }
    }
}
