//! HTTP client for the two Paystack transaction endpoints.

use geomancy_core::{CurrencyCode, MinorUnits, ShippingAddress, TransactionReference};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use super::GatewayError;
use super::types::{
    Envelope, InitializeData, InitializeRequest, TransactionMetadata, VerifiedTransaction,
};
use crate::config::GatewayConfig;

/// Paystack API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: String,
    currency: CurrencyCode,
    callback_url: String,
}

impl std::fmt::Debug for PaystackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackClient")
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl PaystackClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.secret_key.expose_secret()))
                .map_err(|_| GatewayError::InvalidCredential)?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
            currency: config.currency,
            callback_url: config.callback_url.to_string(),
        })
    }

    /// Currency every transaction is initialized in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Start a transaction and obtain the hosted checkout URL.
    ///
    /// `amount` must already be in minor units and non-zero.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a non-2xx status, or an envelope
    /// with `status: false`.
    #[instrument(skip(self, shipping_address, description))]
    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount: MinorUnits,
        shipping_address: Option<&ShippingAddress>,
        description: Option<&str>,
    ) -> Result<InitializeData, GatewayError> {
        let url = format!("{}/transaction/initialize", self.base_url);
        let body = InitializeRequest {
            email,
            amount,
            currency: self.currency,
            callback_url: &self.callback_url,
            metadata: TransactionMetadata {
                shipping_address,
                description,
            },
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let envelope: Envelope<InitializeData> = read_envelope(response).await?;

        if !envelope.status {
            return Err(GatewayError::Rejected(envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::MalformedResponse("missing data".to_string()))?;

        tracing::info!(reference = %data.reference, "Transaction initialized");
        Ok(data)
    }

    /// Look up the outcome of a transaction.
    ///
    /// A transaction that exists but did not succeed is returned as
    /// `Ok` with a failed status, not as an error.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a non-2xx status, or an envelope
    /// with `status: false`.
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> Result<VerifiedTransaction, GatewayError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.base_url,
            urlencoding::encode(reference.as_str())
        );

        let response = self.client.get(&url).send().await?;
        let envelope: Envelope<serde_json::Value> = read_envelope(response).await?;

        if !envelope.status {
            return Err(GatewayError::Rejected(envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::MalformedResponse("missing data".to_string()))?;
        let verified = VerifiedTransaction::from_data(data);

        tracing::info!(
            gateway_status = %verified.gateway_status,
            success = verified.status.is_success(),
            "Transaction verified"
        );
        Ok(verified)
    }
}

/// Check the HTTP status and decode the envelope.
async fn read_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>, GatewayError> {
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
}
