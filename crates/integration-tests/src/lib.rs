//! Test harness for Geomancy Shop.
//!
//! Spins up, on ephemeral localhost ports:
//! - a fake payment gateway speaking the Paystack transaction API,
//! - the real relay router pointed at it,
//! - a fake BaaS serving the PostgREST `orders` table.
//!
//! The storefront side then talks to all of them over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p geomancy-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::Json;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use geomancy_core::CurrencyCode;
use geomancy_relay::config::{GatewayConfig, RelayConfig, SentryConfig};
use geomancy_storefront::baas::BaasClient;
use geomancy_storefront::checkout::{Navigator, NoticeLevel, Notifier};
use geomancy_storefront::config::BaasConfig;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storefront origin admitted by the relay.
pub const ORIGIN: &str = "https://shop.test";

/// Emails the fake gateway treats specially.
pub const DECLINED_EMAIL: &str = "declined@example.com";
pub const OUTAGE_EMAIL: &str = "outage@example.com";

async fn serve(router: Router) -> Result<Url, BoxError> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(Url::parse(&format!("http://{addr}"))?)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Payment gateway
// ============================================================================

/// Records what the relay sent to the gateway.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub initialized: Arc<Mutex<Vec<Value>>>,
    pub authorization: Arc<Mutex<Vec<String>>>,
    counter: Arc<AtomicUsize>,
}

impl FakeGateway {
    #[must_use]
    pub fn initialized(&self) -> Vec<Value> {
        lock(&self.initialized).clone()
    }

    /// `Authorization` headers seen, one per request.
    #[must_use]
    pub fn authorization(&self) -> Vec<String> {
        lock(&self.authorization).clone()
    }
}

async fn gateway_initialize(
    State(fake): State<FakeGateway>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    lock(&fake.authorization).push(auth);

    if body["email"] == OUTAGE_EMAIL {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }

    let n = fake.counter.fetch_add(1, Ordering::SeqCst) + 1;
    let reference = if body["email"] == DECLINED_EMAIL {
        format!("ref_declined_{n}")
    } else {
        format!("ref_it_{n}")
    };
    lock(&fake.initialized).push(body);

    Json(json!({
        "status": true,
        "message": "Authorization URL created",
        "data": {
            "authorization_url": format!("https://checkout.test/{reference}"),
            "access_code": format!("acc_{n}"),
            "reference": reference
        }
    }))
    .into_response()
}

async fn gateway_verify(Path(reference): Path<String>) -> Response {
    let status = if reference.starts_with("ref_declined_") {
        "abandoned"
    } else if reference.starts_with("ref_it_") {
        "success"
    } else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": false, "message": "Transaction reference not found" })),
        )
            .into_response();
    };

    Json(json!({
        "status": true,
        "message": "Verification successful",
        "data": { "status": status, "reference": reference, "amount": 1000, "currency": "GHS" }
    }))
    .into_response()
}

/// Start the fake gateway.
///
/// # Errors
///
/// Returns error if no local port can be bound.
pub async fn spawn_gateway() -> Result<(Url, FakeGateway), BoxError> {
    let fake = FakeGateway::default();
    let router = Router::new()
        .route("/transaction/initialize", post(gateway_initialize))
        .route("/transaction/verify/{reference}", get(gateway_verify))
        .with_state(fake.clone());
    Ok((serve(router).await?, fake))
}

/// Start the relay in front of `gateway_url`.
///
/// # Errors
///
/// Returns error if the relay cannot be built or bound.
pub async fn spawn_relay(gateway_url: Url) -> Result<Url, BoxError> {
    let config = RelayConfig {
        host: "127.0.0.1".parse()?,
        port: 0,
        allowed_origin: ORIGIN.to_string(),
        gateway: GatewayConfig {
            base_url: gateway_url,
            secret_key: SecretString::from("sk_test_9b2e47c1d05f83a6e1c4b7d2"),
            currency: CurrencyCode::GHS,
            callback_url: Url::parse(&format!("{ORIGIN}/checkout-success"))?,
            timeout: None,
        },
        static_dir: None,
        sentry: SentryConfig::default(),
    };
    let app = geomancy_relay::app(geomancy_relay::AppState::new(config)?);
    serve(app).await
}

// ============================================================================
// BaaS
// ============================================================================

/// Minimal PostgREST over an in-memory `orders` table.
#[derive(Clone, Default)]
pub struct FakeBaas {
    pub rows: Arc<Mutex<Vec<Value>>>,
    /// When set, every PATCH answers 503.
    pub fail_updates: Arc<AtomicBool>,
}

impl FakeBaas {
    #[must_use]
    pub fn rows(&self) -> Vec<Value> {
        lock(&self.rows).clone()
    }

    #[must_use]
    pub fn row(&self, id: &str) -> Option<Value> {
        self.rows().into_iter().find(|r| r["id"] == id)
    }
}

fn filter_value(query: &str, column: &str) -> Option<String> {
    let prefix = format!("{column}=eq.");
    query
        .split('&')
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .and_then(|v| urlencoding::decode(v).ok())
        .map(std::borrow::Cow::into_owned)
}

/// PostgREST `status=in.(a,b)` filter; absent means any status.
fn status_matches(query: &str, row: &Value) -> bool {
    query
        .split('&')
        .find_map(|part| part.strip_prefix("status=in.("))
        .is_none_or(|list| {
            list.trim_end_matches(')')
                .split(',')
                .any(|status| row["status"] == status)
        })
}

async fn baas_insert(State(fake): State<FakeBaas>, Json(mut row): Json<Value>) -> Response {
    let mut rows = lock(&fake.rows);
    row["id"] = json!(format!("order_{}", rows.len() + 1));
    rows.push(row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn baas_patch(
    State(fake): State<FakeBaas>,
    RawQuery(query): RawQuery,
    Json(patch): Json<Value>,
) -> Response {
    if fake.fail_updates.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "database is restarting").into_response();
    }
    let query = query.unwrap_or_default();
    let id = filter_value(&query, "id").unwrap_or_default();
    let mut rows = lock(&fake.rows);
    let mut updated = Vec::new();
    for row in rows
        .iter_mut()
        .filter(|r| r["id"] == id.as_str() && status_matches(&query, r))
    {
        if let Some(fields) = patch.as_object() {
            for (key, value) in fields {
                row[key] = value.clone();
            }
        }
        updated.push(row.clone());
    }
    Json(Value::Array(updated)).into_response()
}

async fn baas_select(State(fake): State<FakeBaas>, RawQuery(query): RawQuery) -> Json<Value> {
    let query = query.unwrap_or_default();
    let id = filter_value(&query, "id");
    let email = filter_value(&query, "customerEmail");
    let mut rows: Vec<Value> = lock(&fake.rows)
        .iter()
        .filter(|r| id.as_deref().is_none_or(|id| r["id"] == id))
        .filter(|r| email.as_deref().is_none_or(|e| r["customerEmail"] == e))
        .cloned()
        .collect();
    rows.reverse();
    Json(Value::Array(rows))
}

/// Start the fake BaaS and a client for it.
///
/// # Errors
///
/// Returns error if no local port can be bound.
pub async fn spawn_baas() -> Result<(BaasClient, FakeBaas), BoxError> {
    let fake = FakeBaas::default();
    let router = Router::new()
        .route(
            "/rest/v1/orders",
            get(baas_select).post(baas_insert).patch(baas_patch),
        )
        .with_state(fake.clone());
    let url = serve(router).await?;
    let client = BaasClient::new(&BaasConfig {
        url,
        anon_key: SecretString::from("anon-integration-key"),
    })?;
    Ok((client, fake))
}

// ============================================================================
// Browser stand-ins
// ============================================================================

/// Records navigations and toasts in order.
#[derive(Clone, Default)]
pub struct Browser {
    events: Arc<Mutex<Vec<String>>>,
}

impl Browser {
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("navigate ").map(str::to_string))
            .collect()
    }
}

impl Navigator for Browser {
    fn navigate(&self, url: &str) {
        lock(&self.events).push(format!("navigate {url}"));
    }
}

impl Notifier for Browser {
    fn notify(&self, level: NoticeLevel, message: &str) {
        lock(&self.events).push(format!("notify {level:?} {message}"));
    }
}
