//! Integration test harness for Driftwood.
//!
//! Boots the storefront router in-process against mock collaborator HTTP
//! servers (content backend and payment provider), then drives the checkout
//! flow over real HTTP with a cookie-carrying client.
//!
//! Every collaborator request lands in one shared [`CallLog`], so tests can
//! assert not just *that* a call happened but *in which order* - the
//! checkout flow's core guarantees are ordering guarantees (persist before
//! intent, validate before anything).

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;

use driftwood_storefront::config::{SanityConfig, StorefrontConfig, StripeConfig};
use driftwood_storefront::state::AppState;
use driftwood_storefront::{middleware, routes};

// =============================================================================
// Call recording
// =============================================================================

/// One recorded collaborator request.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub body: String,
}

/// Shared, ordered log of every collaborator request across both mocks.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    fn record(&self, endpoint: &'static str, body: String) {
        self.inner
            .lock()
            .unwrap()
            .push(RecordedCall { endpoint, body });
    }

    /// All calls, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().clone()
    }

    /// The endpoints hit, in arrival order.
    pub fn endpoints(&self) -> Vec<&'static str> {
        self.calls().iter().map(|call| call.endpoint).collect()
    }

    /// Number of calls to one endpoint.
    pub fn count(&self, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    /// Body of the first call to an endpoint, if any.
    pub fn first_body(&self, endpoint: &str) -> Option<String> {
        self.calls()
            .iter()
            .find(|call| call.endpoint == endpoint)
            .map(|call| call.body.clone())
    }
}

/// Endpoint labels used in the log.
pub mod endpoints {
    pub const SANITY_QUERY: &str = "sanity.query";
    pub const SANITY_MUTATE: &str = "sanity.mutate";
    pub const STRIPE_CREATE_INTENT: &str = "stripe.create_intent";
    pub const STRIPE_CONFIRM_INTENT: &str = "stripe.confirm_intent";
}

// =============================================================================
// Mock content backend
// =============================================================================

#[derive(Clone)]
struct MockSanityState {
    log: CallLog,
    fail_mutations: Arc<AtomicBool>,
}

async fn mock_sanity_query(State(state): State<MockSanityState>) -> Response {
    state.log.record(endpoints::SANITY_QUERY, String::new());

    // The catalog the tests rely on: one discounted product and one small
    // flat-priced one.
    Json(serde_json::json!({
        "ms": 3,
        "result": [
            {
                "id": "oak-table",
                "name": "Oak Table",
                "price": 100.0,
                "discountPercentage": 20.0
            },
            {
                "id": "linen-cushion",
                "name": "Linen Cushion",
                "price": 12.50
            }
        ]
    }))
    .into_response()
}

async fn mock_sanity_mutate(State(state): State<MockSanityState>, body: String) -> Response {
    state.log.record(endpoints::SANITY_MUTATE, body);

    if state.fail_mutations.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": { "description": "mutation rejected by test double" }
            })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "transactionId": "txn-test-1",
        "results": [ { "id": "order-test-1", "operation": "create" } ]
    }))
    .into_response()
}

async fn spawn_mock_sanity(log: CallLog, fail_mutations: Arc<AtomicBool>) -> std::net::SocketAddr {
    let state = MockSanityState {
        log,
        fail_mutations,
    };

    let app = Router::new()
        .route("/{version}/data/query/{dataset}", get(mock_sanity_query))
        .route("/{version}/data/mutate/{dataset}", post(mock_sanity_mutate))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// =============================================================================
// Mock payment provider
// =============================================================================

#[derive(Clone)]
struct MockStripeState {
    log: CallLog,
    fail_intents: Arc<AtomicBool>,
    decline_message: Arc<Mutex<Option<String>>>,
}

async fn mock_create_intent(State(state): State<MockStripeState>, body: String) -> Response {
    state.log.record(endpoints::STRIPE_CREATE_INTENT, body);

    if state.fail_intents.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": { "message": "intent creation rejected by test double" }
            })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "id": "pi_test_1",
        "client_secret": "pi_test_1_secret_abc",
        "status": "requires_payment_method"
    }))
    .into_response()
}

async fn mock_confirm_intent(
    State(state): State<MockStripeState>,
    Path(id): Path<String>,
    body: String,
) -> Response {
    state.log.record(endpoints::STRIPE_CONFIRM_INTENT, body);

    if let Some(message) = state.decline_message.lock().unwrap().clone() {
        return (
            StatusCode::PAYMENT_REQUIRED,
            Json(serde_json::json!({
                "error": { "message": message, "type": "card_error" }
            })),
        )
            .into_response();
    }

    Json(serde_json::json!({ "id": id, "status": "succeeded" })).into_response()
}

async fn spawn_mock_stripe(
    log: CallLog,
    fail_intents: Arc<AtomicBool>,
    decline_message: Arc<Mutex<Option<String>>>,
) -> std::net::SocketAddr {
    let state = MockStripeState {
        log,
        fail_intents,
        decline_message,
    };

    let app = Router::new()
        .route("/v1/payment_intents", post(mock_create_intent))
        .route("/v1/payment_intents/{id}/confirm", post(mock_confirm_intent))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// =============================================================================
// Storefront under test
// =============================================================================

/// A running storefront wired to mock collaborators.
pub struct TestHarness {
    pub base_url: String,
    pub calls: CallLog,
    pub fail_mutations: Arc<AtomicBool>,
    pub fail_intents: Arc<AtomicBool>,
    decline_message: Arc<Mutex<Option<String>>>,
}

impl TestHarness {
    /// Boot the mocks and the storefront on ephemeral ports.
    pub async fn spawn() -> Self {
        let calls = CallLog::default();
        let fail_mutations = Arc::new(AtomicBool::new(false));
        let fail_intents = Arc::new(AtomicBool::new(false));
        let decline_message = Arc::new(Mutex::new(None));

        let sanity_addr = spawn_mock_sanity(calls.clone(), fail_mutations.clone()).await;
        let stripe_addr =
            spawn_mock_stripe(calls.clone(), fail_intents.clone(), decline_message.clone()).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let config = StorefrontConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            sanity: SanityConfig {
                project_id: "testproj".to_string(),
                dataset: "test".to_string(),
                api_version: "2021-06-07".to_string(),
                api_token: SecretString::from("test-token"),
                api_base: Some(format!("http://{sanity_addr}")),
            },
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_harness"),
                publishable_key: "pk_test_harness".to_string(),
                api_base: Some(format!("http://{stripe_addr}")),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config.clone());
        let session_layer = middleware::create_session_layer(&config);

        // Same stack as the binary, minus the Sentry layers.
        let app = Router::new()
            .merge(routes::routes())
            .layer(axum::middleware::from_fn(
                middleware::security_headers_middleware,
            ))
            .layer(axum::middleware::from_fn(middleware::csp_nonce_middleware))
            .layer(session_layer)
            .layer(axum::middleware::from_fn(middleware::request_id_middleware))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            calls,
            fail_mutations,
            fail_intents,
            decline_message,
        }
    }

    /// A client with a cookie store and redirects disabled, so tests can
    /// assert `Location` headers themselves.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    /// Absolute URL for a path on the storefront under test.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Make the provider decline confirmations with this message.
    pub fn decline_payments_with(&self, message: &str) {
        *self.decline_message.lock().unwrap() = Some(message.to_string());
    }
}

// =============================================================================
// Flow helpers
// =============================================================================

/// Add a product to the session cart.
pub async fn add_to_cart(client: &reqwest::Client, harness: &TestHarness, product_id: &str, quantity: u32) {
    let response = client
        .post(harness.url("/cart/add"))
        .form(&[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.to_string()),
        ])
        .send()
        .await
        .unwrap();
    // Plain form post redirects to the cart page.
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

/// Fetch the checkout page and pull out the one-time form token.
pub async fn fetch_checkout_token(client: &reqwest::Client, harness: &TestHarness) -> String {
    let html = client
        .get(harness.url("/checkout"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    extract_checkout_token(&html).expect("checkout page should embed a checkout token")
}

/// Extract the hidden checkout token from rendered checkout HTML.
pub fn extract_checkout_token(html: &str) -> Option<String> {
    let marker = "name=\"checkout_token\" value=\"";
    let start = html.find(marker)? + marker.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(ToOwned::to_owned)
}

/// Billing form fields for an order submission.
pub fn order_form(token: &str, payment_method: Option<&str>) -> Vec<(String, String)> {
    let mut form = vec![
        ("first_name".to_string(), "Ada".to_string()),
        ("last_name".to_string(), "Lovelace".to_string()),
        ("company_name".to_string(), String::new()),
        ("country_region".to_string(), "UK".to_string()),
        ("street_address".to_string(), "12 Analytical Row".to_string()),
        ("city".to_string(), "London".to_string()),
        ("postal_code".to_string(), "N1 9GU".to_string()),
        ("phone".to_string(), "020 7946 0000".to_string()),
        ("email".to_string(), "ada@example.com".to_string()),
        ("additional_notes".to_string(), String::new()),
        ("checkout_token".to_string(), token.to_string()),
    ];

    if let Some(method) = payment_method {
        form.push(("payment_method".to_string(), method.to_string()));
    }

    form
}
