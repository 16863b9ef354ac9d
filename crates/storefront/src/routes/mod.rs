//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (featured products)
//! GET  /health                 - Health check
//! GET  /robots.txt             - Robots directives
//!
//! # Products
//! GET  /products               - Product listing (?page=N)
//! GET  /products/{slug}        - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout wizard
//! GET  /checkout               - Redirect to the current step
//! GET  /checkout/customer      - Step 1: contact details
//! POST /checkout/customer
//! GET  /checkout/delivery      - Step 2: delivery or pickup
//! POST /checkout/delivery
//! GET  /checkout/payment       - Step 3: summary and pay button
//! POST /checkout/payment       - Create order, initialize payment, redirect to Paystack
//! POST /checkout/back          - Go back one step
//! GET  /checkout/callback      - Paystack return: verify payment, show result
//! ```

pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;
pub mod robots;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use perfumery_core::Cart;

use crate::analytics::Analytics;
use crate::middleware::api_rate_limiter;
use crate::seo::SeoMeta;
use crate::state::AppState;

/// Layout data every full page needs: head metadata, analytics, the CSP
/// nonce and the cart badge.
#[derive(Debug, Clone)]
pub struct Page {
    pub seo: SeoMeta,
    pub analytics: Analytics,
    pub nonce: String,
    pub cart_count: u32,
}

impl Page {
    #[must_use]
    pub fn new(state: &AppState, seo: SeoMeta, nonce: String, cart: &Cart) -> Self {
        let config = state.config();
        Self {
            seo,
            analytics: Analytics::new(&config.analytics, config.store.currency),
            nonce,
            cart_count: cart.item_count(),
        }
    }
}

/// Whether the request was made by HTMX.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
///
/// Mutations are rate limited since each one may reach the commerce API.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .layer(api_rate_limiter())
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
}

/// Create the checkout wizard router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/customer", post(checkout::submit_customer))
        .route("/delivery", post(checkout::submit_delivery))
        .route("/payment", post(checkout::pay))
        .route("/back", post(checkout::back))
        .layer(api_rate_limiter())
        .route("/", get(checkout::index))
        .route("/customer", get(checkout::customer))
        .route("/delivery", get(checkout::delivery))
        .route("/payment", get(checkout::payment))
        .route("/callback", get(checkout::callback))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/robots.txt", get(robots::robots_txt))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
