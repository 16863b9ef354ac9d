//! Perfumery Storefront library.
//!
//! Server-rendered perfume storefront: catalogue pages, a session cart, a
//! three-step checkout wizard and the Paystack payment hand-off, all over a
//! remote commerce REST API. Exposed as a library so the router can be
//! driven in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seo;
pub mod state;

use std::path::Path;

use axum::{Router, middleware::from_fn};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Directory holding `css/`, `js/` and images, relative to the crate root.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the full application: routes, static files, sessions and the
/// middleware stack (see [`middleware`] for the order).
///
/// Sentry layers are added by the binary so tests run without a client.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(Path::new(STATIC_DIR)))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::csp_nonce_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
