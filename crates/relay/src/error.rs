//! Relay error handling with Sentry integration.
//!
//! Every failure reaching the browser is a JSON body with a generic message.
//! Gateway response bodies and the secret key never leave the relay.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use geomancy_core::{RelayErrorBody, VerifyTransactionResponse};
use thiserror::Error;

use crate::gateway::GatewayError;

/// Relay-level error type returned by route handlers.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Request rejected before any gateway call.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Gateway failed to initialize the transaction.
    #[error("Initialization failed: {0}")]
    InitializeFailed(#[source] GatewayError),

    /// Gateway could not be asked about the transaction.
    #[error("Verification failed: {0}")]
    VerifyFailed(#[source] GatewayError),

    /// Gateway answered, but the transaction did not succeed.
    #[error("Transaction not successful: {0}")]
    VerificationDeclined(String),
}

impl RelayError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::VerificationDeclined(_) => StatusCode::BAD_REQUEST,
            Self::InitializeFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::VerifyFailed(err) => {
                if err.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        match self {
            Self::BadRequest(message) => {
                (status, Json(RelayErrorBody { error: message })).into_response()
            }
            Self::InitializeFailed(_) => (
                status,
                Json(RelayErrorBody {
                    error: "Transaction initialization failed".to_string(),
                }),
            )
                .into_response(),
            Self::VerifyFailed(_) if status.is_server_error() => (
                status,
                Json(RelayErrorBody {
                    error: "Failed to verify transaction".to_string(),
                }),
            )
                .into_response(),
            Self::VerifyFailed(_) | Self::VerificationDeclined(_) => (
                status,
                Json(VerifyTransactionResponse {
                    success: false,
                    message: "Transaction verification failed".to_string(),
                    data: None,
                }),
            )
                .into_response(),
        }
    }
}

/// Result type alias for `RelayError`.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_relay_error_status_codes() {
        assert_eq!(
            RelayError::BadRequest("No items found in request".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::InitializeFailed(GatewayError::InvalidCredential).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::VerifyFailed(GatewayError::Api {
                status: 400,
                message: "Transaction reference not found".to_string()
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::VerifyFailed(GatewayError::MalformedResponse("eof".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::VerificationDeclined("abandoned".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_gateway_message_is_not_exposed() {
        let response = RelayError::InitializeFailed(GatewayError::Api {
            status: 401,
            message: "Invalid key sk_live_abc".to_string(),
        })
        .into_response();

        let json = body_json(response).await;
        assert_eq!(json["error"], "Transaction initialization failed");
        assert!(!json.to_string().contains("sk_live"));
    }

    #[tokio::test]
    async fn test_declined_uses_verification_body() {
        let response = RelayError::VerificationDeclined("abandoned".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Transaction verification failed");
    }
}
