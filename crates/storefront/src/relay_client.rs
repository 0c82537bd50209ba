//! Browser-side client for the payment relay.
//!
//! The storefront never talks to the payment gateway directly. It asks the
//! relay, which holds the gateway secret.

use std::future::Future;

use geomancy_core::{
    InitializeTransactionRequest, InitializeTransactionResponse, RelayErrorBody,
    TransactionReference, VerificationStatus, VerifyTransactionResponse,
};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::instrument;
use url::Url;

/// Errors calling the relay.
#[derive(Debug, Error)]
pub enum RelayClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Relay answered with an error status.
    #[error("relay error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Relay response did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// What the relay said about a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// The two payment calls the checkout needs.
pub trait PaymentRelay: Send + Sync {
    /// Ask for a hosted-checkout URL and transaction reference.
    fn initialize_transaction(
        &self,
        request: &InitializeTransactionRequest,
    ) -> impl Future<Output = Result<InitializeTransactionResponse, RelayClientError>> + Send;

    /// Ask whether the transaction behind `reference` succeeded.
    ///
    /// A declined transaction is `Ok` with a failed status.
    fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> impl Future<Output = Result<VerificationOutcome, RelayClientError>> + Send;
}

impl<T: PaymentRelay> PaymentRelay for std::sync::Arc<T> {
    fn initialize_transaction(
        &self,
        request: &InitializeTransactionRequest,
    ) -> impl Future<Output = Result<InitializeTransactionResponse, RelayClientError>> + Send {
        (**self).initialize_transaction(request)
    }

    fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> impl Future<Output = Result<VerificationOutcome, RelayClientError>> + Send {
        (**self).verify_transaction(reference)
    }
}

/// HTTP client for the relay.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// Create a new relay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &Url) -> Result<Self, RelayClientError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
        })
    }
}

impl PaymentRelay for RelayClient {
    #[instrument(skip(self, request))]
    async fn initialize_transaction(
        &self,
        request: &InitializeTransactionRequest,
    ) -> Result<InitializeTransactionResponse, RelayClientError> {
        let url = format!("{}/initialize-transaction", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| RelayClientError::Parse(e.to_string()))
    }

    #[instrument(skip(self), fields(reference = %reference))]
    async fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> Result<VerificationOutcome, RelayClientError> {
        let url = format!(
            "{}/verify-transaction?reference={}",
            self.base_url,
            urlencoding::encode(reference.as_str())
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.is_success() || status == StatusCode::BAD_REQUEST {
            let body: VerifyTransactionResponse = response
                .json()
                .await
                .map_err(|e| RelayClientError::Parse(e.to_string()))?;
            let verified = status.is_success() && body.success;
            return Ok(VerificationOutcome {
                status: if verified {
                    VerificationStatus::Success
                } else {
                    VerificationStatus::Failed
                },
                message: body.message,
                data: body.data,
            });
        }

        Err(api_error(status, response).await)
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> RelayClientError {
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<RelayErrorBody>(&text).map_or(text, |body| body.error);
    RelayClientError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use geomancy_core::{MinorUnits, RelayLineItem};
    use serde_json::{Value, json};

    use super::*;

    async fn spawn_relay() -> RelayClient {
        let router = Router::new()
            .route(
                "/initialize-transaction",
                post(|Json(body): Json<Value>| async move {
                    if body["items"].as_array().is_none_or(Vec::is_empty) {
                        return (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({ "error": "No items found in request" })),
                        )
                            .into_response();
                    }
                    Json(json!({
                        "authorization_url": "https://checkout.test/ref_123",
                        "reference": "ref_123"
                    }))
                    .into_response()
                }),
            )
            .route(
                "/verify-transaction",
                get(|Query(q): Query<std::collections::HashMap<String, String>>| async move {
                    let response: Response = match q.get("reference").map(String::as_str) {
                        Some("ref_123") => Json(json!({
                            "success": true,
                            "message": "Transaction verified successfully",
                            "data": { "status": "success" }
                        }))
                        .into_response(),
                        Some("ref_down") => (
                            AxumStatus::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "Failed to verify transaction" })),
                        )
                            .into_response(),
                        _ => (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({
                                "success": false,
                                "message": "Transaction verification failed"
                            })),
                        )
                            .into_response(),
                    };
                    response
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        RelayClient::new(&Url::parse(&format!("http://{addr}/")).unwrap()).unwrap()
    }

    fn request(items: Vec<RelayLineItem>) -> InitializeTransactionRequest {
        InitializeTransactionRequest {
            items: Some(items),
            email: "a@b.com".to_string(),
            shipping_address: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_initialize_returns_url_and_reference() {
        let relay = spawn_relay().await;
        let response = relay
            .initialize_transaction(&request(vec![RelayLineItem {
                price: MinorUnits::new(500),
                qty: 2,
            }]))
            .await
            .unwrap();

        assert_eq!(response.authorization_url, "https://checkout.test/ref_123");
        assert_eq!(response.reference.as_str(), "ref_123");
    }

    #[tokio::test]
    async fn test_initialize_error_carries_relay_message() {
        let relay = spawn_relay().await;
        let err = relay.initialize_transaction(&request(vec![])).await.unwrap_err();

        assert!(matches!(
            err,
            RelayClientError::Api { status: 400, ref message }
                if message == "No items found in request"
        ));
    }

    #[tokio::test]
    async fn test_verify_outcomes() {
        let relay = spawn_relay().await;

        let ok = relay
            .verify_transaction(&TransactionReference::new("ref_123"))
            .await
            .unwrap();
        assert!(ok.status.is_success());
        assert_eq!(ok.data.unwrap()["status"], "success");

        let declined = relay
            .verify_transaction(&TransactionReference::new("ref_nope"))
            .await
            .unwrap();
        assert_eq!(declined.status, VerificationStatus::Failed);

        let err = relay
            .verify_transaction(&TransactionReference::new("ref_down"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayClientError::Api { status: 500, .. }));
    }
}
