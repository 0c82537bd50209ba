//! Transaction initialization and verification handlers.
//!
//! Both are thin pass-throughs to the gateway client; the relay keeps no
//! record of the transactions it starts.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use geomancy_core::{
    Email, InitializeTransactionRequest, InitializeTransactionResponse, MinorUnits, RelayLineItem,
    TransactionReference, VerifyTransactionResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{RelayError, Result};
use crate::state::AppState;

/// Sum `price × qty` over the requested items, in minor units.
///
/// # Errors
///
/// Returns `BadRequest` when items are missing or empty, a quantity is zero,
/// the sum overflows, or the total is zero.
pub fn calculate_order_amount(items: Option<&[RelayLineItem]>) -> Result<MinorUnits> {
    let items =
        items.ok_or_else(|| RelayError::BadRequest("No items found in request".to_string()))?;
    if items.is_empty() {
        return Err(RelayError::BadRequest(
            "Items array is required to calculate order amount".to_string(),
        ));
    }

    let mut total = MinorUnits::ZERO;
    for item in items {
        if item.qty == 0 {
            return Err(RelayError::BadRequest(
                "Item quantity must be at least 1".to_string(),
            ));
        }
        total = item
            .price
            .checked_mul(item.qty)
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| RelayError::BadRequest("Order amount is too large".to_string()))?;
    }

    if total.is_zero() {
        return Err(RelayError::BadRequest(
            "Order amount must be greater than zero".to_string(),
        ));
    }

    Ok(total)
}

/// `POST /initialize-transaction`
#[instrument(skip_all)]
pub async fn initialize(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InitializeTransactionRequest>, JsonRejection>,
) -> Result<Json<InitializeTransactionResponse>> {
    let Json(request) = payload.map_err(|e| RelayError::BadRequest(e.body_text()))?;

    let amount = calculate_order_amount(request.items.as_deref())?;
    let email = Email::parse(&request.email)
        .map_err(|e| RelayError::BadRequest(format!("Invalid email: {e}")))?;

    tracing::info!(amount = %amount, "Initializing transaction");

    let data = state
        .gateway()
        .initialize_transaction(
            email.as_str(),
            amount,
            request.shipping_address.as_ref(),
            request.description.as_deref(),
        )
        .await
        .map_err(RelayError::InitializeFailed)?;

    Ok(Json(InitializeTransactionResponse {
        authorization_url: data.authorization_url,
        reference: data.reference,
    }))
}

/// Query string of `GET /verify-transaction`.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    reference: Option<String>,
}

/// `GET /verify-transaction?reference=...`
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyTransactionResponse>> {
    let reference = params
        .reference
        .filter(|r| !r.trim().is_empty())
        .map(TransactionReference::new)
        .ok_or_else(|| RelayError::VerificationDeclined("missing reference".to_string()))?;

    let verified = state
        .gateway()
        .verify_transaction(&reference)
        .await
        .map_err(RelayError::VerifyFailed)?;

    if !verified.status.is_success() {
        return Err(RelayError::VerificationDeclined(verified.gateway_status));
    }

    Ok(Json(VerifyTransactionResponse {
        success: true,
        message: "Transaction verified successfully".to_string(),
        data: Some(verified.raw),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: u64, qty: u32) -> RelayLineItem {
        RelayLineItem {
            price: MinorUnits::new(price),
            qty,
        }
    }

    #[test]
    fn test_calculate_order_amount_sums_lines() {
        let total = calculate_order_amount(Some(&[item(500, 2), item(250, 1)])).ok();
        assert_eq!(total, Some(MinorUnits::new(1250)));
    }

    #[test]
    fn test_calculate_order_amount_rejects_bad_input() {
        assert!(calculate_order_amount(None).is_err());
        assert!(calculate_order_amount(Some(&[])).is_err());
        assert!(calculate_order_amount(Some(&[item(500, 0)])).is_err());
        assert!(calculate_order_amount(Some(&[item(0, 3)])).is_err());
        assert!(calculate_order_amount(Some(&[item(u64::MAX, 2)])).is_err());
        assert!(calculate_order_amount(Some(&[item(u64::MAX, 1), item(1, 1)])).is_err());
    }
}
