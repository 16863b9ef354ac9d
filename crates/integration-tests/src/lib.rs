//! Integration test harness for the perfumery storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p perfumery-integration-tests
//! ```
//!
//! [`TestContext::new`] starts a [`StubApi`] standing in for the commerce
//! REST API, then the real storefront router pointed at it. Both listen on
//! ephemeral localhost ports. The client keeps cookies (so the session
//! survives between requests) and does not follow redirects, so tests can
//! assert on `Location` headers.
//!
//! # Stub catalogue
//!
//! | Slug         | Price     | Stock |
//! |--------------|-----------|-------|
//! | `oud-royale` | 45 000.50 | 10    |
//! | `rose-noir`  | 30 000.00 | 0     |
//!
//! Payment references starting with `failed-` verify as failed; anything
//! else verifies as successful.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use perfumery_storefront::config::StorefrontConfig;
use perfumery_storefront::state::AppState;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Order id handed out by the stub for every created order.
pub const STUB_ORDER_ID: &str = "665f1c2ab4";

/// Reference returned by the stub's initialize-payment endpoint.
pub const STUB_REFERENCE: &str = "T123456789";

/// Hosted payment page returned by the stub.
pub const STUB_AUTHORIZATION_URL: &str = "https://checkout.paystack.com/0peioxfhpn";

/// Requests the stub API has received, for assertions.
#[derive(Debug, Default)]
pub struct Recorded {
    pub orders: Vec<Value>,
    pub payment_initializations: Vec<Value>,
    pub verifications: Vec<String>,
    pub tenant_domains: Vec<String>,
}

/// Stub commerce REST API.
#[derive(Debug, Clone, Default)]
pub struct StubApi {
    recorded: Arc<Mutex<Recorded>>,
}

impl StubApi {
    /// Created order bodies, oldest first.
    pub fn orders(&self) -> Vec<Value> {
        self.recorded.lock().unwrap().orders.clone()
    }

    /// Initialize-payment bodies, oldest first.
    pub fn payment_initializations(&self) -> Vec<Value> {
        self.recorded.lock().unwrap().payment_initializations.clone()
    }

    /// Verified references, oldest first.
    pub fn verifications(&self) -> Vec<String> {
        self.recorded.lock().unwrap().verifications.clone()
    }

    /// `X-Frontend-Domain` values seen on catalogue requests.
    pub fn tenant_domains(&self) -> Vec<String> {
        self.recorded.lock().unwrap().tenant_domains.clone()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/ecommerce/products", get(list_products))
            .route("/api/ecommerce/products/{slug}", get(get_product))
            .route("/api/ecommerce/orders", post(create_order))
            .route("/orders/{order_id}/initialize-payment", post(initialize_payment))
            .route("/orders/{order_id}/verify-payment", get(verify_payment))
            .with_state(self.clone())
    }
}

fn product(slug: &str) -> Option<Value> {
    match slug {
        "oud-royale" => Some(json!({
            "_id": "p-oud-royale",
            "name": "Oud Royale",
            "slug": "oud-royale",
            "description": "<p>Smoky oud with <strong>rose</strong> and amber</p>",
            "price": 45000.5,
            "images": [{ "url": "https://cdn.example.com/oud.jpg", "alt": "Oud Royale bottle" }],
            "stock": 10,
            "brand": { "name": "Maison Lune" },
            "size": "100ml"
        })),
        "rose-noir" => Some(json!({
            "_id": "p-rose-noir",
            "name": "Rose Noir",
            "slug": "rose-noir",
            "price": 30000,
            "images": ["https://cdn.example.com/rose.jpg"],
            "stock": 0
        })),
        _ => None,
    }
}

fn record_tenant(api: &StubApi, headers: &axum::http::HeaderMap) {
    if let Some(domain) = headers.get("x-frontend-domain").and_then(|v| v.to_str().ok()) {
        api.recorded
            .lock()
            .unwrap()
            .tenant_domains
            .push(domain.to_string());
    }
}

async fn list_products(State(api): State<StubApi>, headers: axum::http::HeaderMap) -> Json<Value> {
    record_tenant(&api, &headers);
    let products: Vec<Value> = ["oud-royale", "rose-noir"]
        .into_iter()
        .filter_map(product)
        .collect();
    Json(json!({
        "success": true,
        "data": {
            "products": products,
            "pagination": { "page": 1, "limit": 12, "total": 2, "totalPages": 1 }
        }
    }))
}

async fn get_product(
    State(api): State<StubApi>,
    headers: axum::http::HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    record_tenant(&api, &headers);
    product(&slug).map_or_else(
        || {
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "success": false,
                    "error": { "code": "NOT_FOUND", "message": "Product not found" }
                })),
            )
                .into_response()
        },
        |product| Json(json!({ "success": true, "data": { "product": product } })).into_response(),
    )
}

async fn create_order(State(api): State<StubApi>, Json(body): Json<Value>) -> Json<Value> {
    api.recorded.lock().unwrap().orders.push(body);
    Json(json!({
        "success": true,
        "data": { "order": { "_id": STUB_ORDER_ID, "orderNumber": "PF-1001", "status": "pending" } }
    }))
}

async fn initialize_payment(
    State(api): State<StubApi>,
    Path(order_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if order_id != STUB_ORDER_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Order not found" })),
        )
            .into_response();
    }
    api.recorded.lock().unwrap().payment_initializations.push(body);
    Json(json!({
        "success": true,
        "data": {
            "authorization_url": STUB_AUTHORIZATION_URL,
            "access_code": "0peioxfhpn",
            "reference": STUB_REFERENCE
        }
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    reference: String,
}

async fn verify_payment(
    State(api): State<StubApi>,
    Path(order_id): Path<String>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    if order_id != STUB_ORDER_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": { "message": "Order not found" } })),
        )
            .into_response();
    }
    api.recorded
        .lock()
        .unwrap()
        .verifications
        .push(query.reference.clone());

    let status = if query.reference.starts_with("failed-") {
        "failed"
    } else {
        "success"
    };
    Json(json!({
        "success": true,
        "data": {
            "reference": query.reference,
            "amount": 4_500_050,
            "currency": "NGN",
            "status": status,
            "paidAt": "2026-03-14T10:15:00Z"
        }
    }))
    .into_response()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// A running storefront wired to a stub API.
pub struct TestContext {
    pub client: reqwest::Client,
    pub storefront_url: String,
    pub api: StubApi,
}

impl TestContext {
    pub async fn new() -> Self {
        let api = StubApi::default();
        let api_addr = serve(api.router()).await;

        let config = StorefrontConfig::local(Url::parse(&format!("http://{api_addr}")).unwrap());
        let state = AppState::new(config).unwrap();
        let storefront_addr = serve(perfumery_storefront::app(state)).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            client,
            storefront_url: format!("http://{storefront_addr}"),
            api,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Post as HTMX does, so handlers answer with fragments.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("hx-request", "true")
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Put `quantity` of `slug` in the cart.
    pub async fn add_to_cart(&self, slug: &str, quantity: &str) {
        let response = self
            .htmx_post("/cart/add", &[("slug", slug), ("quantity", quantity)])
            .await;
        assert_eq!(response.status(), 200, "adding {slug} to cart");
    }

    /// Fill in the customer and pickup steps.
    pub async fn complete_details(&self) {
        let response = self
            .post_form(
                "/checkout/customer",
                &[
                    ("email", "ada@example.com"),
                    ("first_name", "Ada"),
                    ("last_name", "Obi"),
                    ("phone", "08031234567"),
                ],
            )
            .await;
        assert_eq!(location(&response), Some("/checkout/delivery"));

        let response = self
            .post_form("/checkout/delivery", &[("method", "pickup")])
            .await;
        assert_eq!(location(&response), Some("/checkout/payment"));
    }
}

/// The `Location` header of a redirect.
pub fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
