//! Thin client for the BaaS REST (PostgREST) interface.
//!
//! Every request carries the project's anon key both as `apikey` and as a
//! bearer token. Tables live under `{base}/rest/v1/{table}`; filters use the
//! PostgREST query grammar (`id=eq.o1`, `order=createdAt.desc`).

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::config::BaasConfig;

/// Errors returned by the BaaS REST interface.
#[derive(Debug, Error)]
pub enum BaasError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// BaaS answered with a non-success status (constraint violation,
    /// row-level security, bad filter).
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected rows.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The anon key cannot be sent as a header.
    #[error("Invalid API key format")]
    InvalidKey,
}

/// BaaS REST client. Cheap to clone.
#[derive(Clone)]
pub struct BaasClient {
    inner: Arc<BaasClientInner>,
}

struct BaasClientInner {
    client: reqwest::Client,
    rest_url: String,
}

impl std::fmt::Debug for BaasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaasClient")
            .field("rest_url", &self.inner.rest_url)
            .finish_non_exhaustive()
    }
}

impl BaasClient {
    /// Create a new BaaS client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BaasConfig) -> Result<Self, BaasError> {
        let key = config.anon_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut apikey = HeaderValue::from_str(key).map_err(|_| BaasError::InvalidKey)?;
        apikey.set_sensitive(true);
        headers.insert("apikey", apikey);

        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| BaasError::InvalidKey)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(BaasClientInner {
                client,
                rest_url: format!("{}/rest/v1", config.url.as_str().trim_end_matches('/')),
            }),
        })
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/{table}", self.inner.rest_url)
        } else {
            format!("{}/{table}?{query}", self.inner.rest_url)
        }
    }

    /// `GET /{table}?{query}` returning all matching rows.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a non-2xx status, or rows that do
    /// not decode as `T`.
    #[instrument(skip(self))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, BaasError> {
        let response = self
            .inner
            .client
            .get(self.table_url(table, query))
            .send()
            .await?;
        read_rows(response).await
    }

    /// `POST /{table}` returning the inserted rows.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a rejected insert, or rows that do
    /// not decode as `R`.
    #[instrument(skip(self, row))]
    pub async fn insert<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &B,
    ) -> Result<Vec<R>, BaasError> {
        let response = self
            .inner
            .client
            .post(self.table_url(table, ""))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        read_rows(response).await
    }

    /// `PATCH /{table}?{filter}` returning the updated rows.
    ///
    /// An empty result means no row matched the filter.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a rejected update, or rows that do
    /// not decode as `R`.
    #[instrument(skip(self, patch))]
    pub async fn update<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        table: &str,
        filter: &str,
        patch: &B,
    ) -> Result<Vec<R>, BaasError> {
        let response = self
            .inner
            .client
            .patch(self.table_url(table, filter))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        read_rows(response).await
    }
}

/// Equality filter on `column`, with the value percent-encoded.
#[must_use]
pub fn eq_filter(column: &str, value: &str) -> String {
    format!("{column}=eq.{}", urlencoding::encode(value))
}

async fn read_rows<R: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<R>, BaasError> {
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(BaasError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| BaasError::Parse(e.to_string()))
}
