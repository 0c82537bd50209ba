//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAAS_URL` - Base URL of the BaaS project (e.g. `https://abc.supabase.co`)
//! - `BAAS_ANON_KEY` - Public (anon) API key of the BaaS project
//! - `RELAY_URL` - Base URL of the payment relay
//!
//! ## Optional
//! - `STOREFRONT_DATA_DIR` - Directory for local and session storage files (default: .geomancy)
//! - `STOREFRONT_CURRENCY` - Display currency (default: GHS)
//! - `CATALOG_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `FEED_POLL_SECS` - Collection feed polling interval (default: 5)

use std::path::PathBuf;
use std::time::Duration;

use geomancy_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// BaaS connection settings
    pub baas: BaasConfig,
    /// Payment relay base URL
    pub relay_url: Url,
    /// Where `local.json` and `session.json` live
    pub data_dir: PathBuf,
    /// Currency used for display
    pub currency: CurrencyCode,
    /// Product catalog cache lifetime
    pub catalog_cache_ttl: Duration,
    /// Collection feed polling interval
    pub feed_poll_interval: Duration,
}

/// BaaS (PostgREST) connection configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BaasConfig {
    /// Project base URL; REST lives under `/rest/v1`
    pub url: Url,
    /// Anon key, sent as `apikey` and bearer token
    pub anon_key: SecretString,
}

impl std::fmt::Debug for BaasConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaasConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            baas: BaasConfig::from_env()?,
            relay_url: parse_url("RELAY_URL", &get_required_env("RELAY_URL")?)?,
            data_dir: PathBuf::from(get_env_or_default("STOREFRONT_DATA_DIR", ".geomancy")),
            currency: get_env_or_default("STOREFRONT_CURRENCY", "GHS")
                .parse::<CurrencyCode>()
                .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_CURRENCY".to_string(), e))?,
            catalog_cache_ttl: get_secs("CATALOG_CACHE_TTL_SECS", 300)?,
            feed_poll_interval: get_secs("FEED_POLL_SECS", 5)?,
        })
    }

    /// Path of the persistent (local storage) file.
    #[must_use]
    pub fn local_storage_path(&self) -> PathBuf {
        self.data_dir.join("local.json")
    }

    /// Path of the session storage file.
    #[must_use]
    pub fn session_storage_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

impl BaasConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let anon_key = SecretString::from(get_required_env("BAAS_ANON_KEY")?.trim().to_owned());
        if anon_key.expose_secret().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "BAAS_ANON_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            url: parse_url("BAAS_URL", &get_required_env("BAAS_URL")?)?,
            anon_key,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs = get_env_or_default(key, &default.to_string())
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
