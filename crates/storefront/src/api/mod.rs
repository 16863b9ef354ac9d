//! Client for the e-commerce REST API.
//!
//! # Architecture
//!
//! - The API is the source of truth for products, orders and payments; the
//!   storefront keeps no copy beyond a short-lived catalogue cache
//! - Every request carries `X-Frontend-Domain` so the API can resolve the tenant
//! - In-memory caching via `moka` for catalogue responses (5 minute TTL)
//! - Failures are never retried; the extracted message is shown to the customer
//!
//! # Endpoints
//!
//! ```text
//! GET  /api/ecommerce/products?limit&page
//! GET  /api/ecommerce/products/:slug
//! POST /api/ecommerce/orders
//! POST /orders/:orderId/initialize-payment
//! GET  /orders/:orderId/verify-payment?reference=...
//! ```

mod cache;
pub mod error_message;
pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use perfumery_core::{ApiErrorCode, OrderId, PaymentReference};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CommerceApiConfig;

pub use cache::{CacheKey, CacheValue};
pub use error_message::{extract_error_message, extract_error_message_from_text};
pub use types::*;

/// Header carrying the storefront's tenant domain.
pub const FRONTEND_DOMAIN_HEADER: &str = "X-Frontend-Domain";

const RATE_LIMIT_LIMIT_HEADER: &str = "X-RateLimit-Limit";
const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";
const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Errors that can occur when calling the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API answered with an error envelope or a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<ApiErrorCode>,
        message: String,
        details: Option<Value>,
    },

    /// The API is throttling this storefront.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        info: RateLimitInfo,
    },

    /// The configured base URL cannot carry a path.
    #[error("Invalid API base URL")]
    InvalidBaseUrl,
}

impl ApiError {
    /// The message to display to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::RateLimited { message, .. } => message.clone(),
            Self::Http(e) if e.is_timeout() => {
                "The shop is taking too long to respond. Please try again.".to_string()
            }
            Self::Http(_) | Self::Parse(_) | Self::InvalidBaseUrl => {
                "We couldn't reach the shop right now. Please try again.".to_string()
            }
        }
    }

    /// The envelope error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&ApiErrorCode> {
        match self {
            Self::Api { code, .. } => code.as_ref(),
            Self::RateLimited { .. } => Some(&ApiErrorCode::RateLimitExceeded),
            _ => None,
        }
    }

    /// Whether the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
            || matches!(self.code(), Some(ApiErrorCode::NotFound))
    }

    /// Whether the customer can fix the problem by changing their input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.code().is_some_and(ApiErrorCode::is_client_error)
    }
}

/// Rate-limit state reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Reset time as sent by the API (epoch seconds or seconds from now).
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Parse the `X-RateLimit-*` headers. Missing or malformed headers are `None`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
        };
        Self {
            limit: parse(RATE_LIMIT_LIMIT_HEADER),
            remaining: parse(RATE_LIMIT_REMAINING_HEADER),
            reset: parse(RATE_LIMIT_RESET_HEADER),
        }
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.limit.is_some() || self.remaining.is_some() || self.reset.is_some()
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(0))
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    tenant_domain: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialisation failure).
    pub fn new(config: &CommerceApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("perfumery-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                tenant_domain: config.tenant_domain.clone(),
                cache,
            }),
        })
    }

    /// Build an endpoint URL from path segments (each percent-encoded).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the (possibly enveloped) response body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .header(FRONTEND_DOMAIN_HEADER, &self.inner.tenant_domain)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        if rate_limit.is_present() {
            debug!(
                limit = ?rate_limit.limit,
                remaining = ?rate_limit.remaining,
                reset = ?rate_limit.reset,
                "API rate limit"
            );
            if rate_limit.is_exhausted() {
                tracing::warn!(reset = ?rate_limit.reset, "API rate limit exhausted");
            }
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited {
                message: extract_error_message_from_text(status.as_u16(), &body),
                info: rate_limit,
            });
        }

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Commerce API returned non-success status"
            );
            return Err(error_from_body(status.as_u16(), &body));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse commerce API response"
            );
            ApiError::Parse(e)
        })?;

        // Some endpoints report failures with a 200 and `success: false`.
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(error_from_value(status.as_u16(), &value));
        }

        let envelope: types::Envelope<T> = serde_json::from_value(value)?;
        Ok(envelope.into_inner())
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    /// List products, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, limit: u32, page: u32) -> Result<ProductList, ApiError> {
        let page = page.max(1);
        let key = CacheKey::Products { limit, page };
        if let Some(CacheValue::Products(list)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(list);
        }

        let url = self.endpoint(&["api", "ecommerce", "products"])?;
        let request = self
            .inner
            .client
            .get(url)
            .query(&[("limit", limit), ("page", page)]);
        let list: ProductList = self.send(request).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(list.clone()))
            .await;
        Ok(list)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, ApiError> {
        let key = CacheKey::Product(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["api", "ecommerce", "products", slug])?;
        let payload: types::ProductPayload = self.send(self.inner.client.get(url)).await?;
        let product = payload.into_product();

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    // =========================================================================
    // Orders & payments
    // =========================================================================

    /// Create an order from the checkout draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the order (validation, stock) or
    /// the request fails.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        let url = self.endpoint(&["api", "ecommerce", "orders"])?;
        let payload: types::OrderPayload =
            self.send(self.inner.client.post(url).json(request)).await?;
        Ok(payload.into_order())
    }

    /// Initialize a Paystack transaction for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway or API refuses, or the request fails.
    #[instrument(skip(self, email), fields(order_id = %order_id))]
    pub async fn initialize_payment(
        &self,
        order_id: &OrderId,
        email: &str,
        callback_url: &str,
    ) -> Result<PaymentInitialization, ApiError> {
        let url = self.endpoint(&["orders", order_id.as_str(), "initialize-payment"])?;
        let body = InitializePaymentRequest {
            email,
            callback_url,
        };
        self.send(self.inner.client.post(url).json(&body)).await
    }

    /// Verify a payment after the customer returns from Paystack.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is unknown or the request fails.
    #[instrument(skip(self), fields(order_id = %order_id, reference = %reference))]
    pub async fn verify_payment(
        &self,
        order_id: &OrderId,
        reference: &PaymentReference,
    ) -> Result<PaymentVerification, ApiError> {
        let url = self.endpoint(&["orders", order_id.as_str(), "verify-payment"])?;
        let request = self
            .inner
            .client
            .get(url)
            .query(&[("reference", reference.as_str())]);
        self.send(request).await
    }
}

/// Build an [`ApiError`] from a non-success response body.
fn error_from_body(status: u16, body: &str) -> ApiError {
    serde_json::from_str::<Value>(body).map_or_else(
        |_| ApiError::Api {
            status,
            code: None,
            message: extract_error_message_from_text(status, body),
            details: None,
        },
        |value| error_from_value(status, &value),
    )
}

fn error_from_value(status: u16, value: &Value) -> ApiError {
    let error = value.get("error");
    ApiError::Api {
        status,
        code: error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .map(ApiErrorCode::from_code),
        message: extract_error_message(status, value),
        details: error.and_then(|e| e.get("details")).cloned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::{Path, Query};
    use axum::http::HeaderMap as AxumHeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    /// Serve `router` on an ephemeral port and return a client pointed at it.
    async fn stub_client(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        ApiClient::new(&CommerceApiConfig {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            tenant_domain: "perfumes.example.com".to_string(),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    fn product_json(slug: &str) -> Value {
        json!({ "_id": format!("id-{slug}"), "name": slug, "slug": slug, "price": 1000 })
    }

    #[tokio::test]
    async fn test_list_products_sends_tenant_header_and_query() {
        let router = Router::new().route(
            "/api/ecommerce/products",
            get(
                |headers: AxumHeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    let tenant = headers
                        .get(FRONTEND_DOMAIN_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({
                        "success": true,
                        "data": {
                            "products": [product_json(&tenant)],
                            "pagination": {
                                "page": q["page"].parse::<u32>().unwrap(),
                                "limit": q["limit"].parse::<u32>().unwrap(),
                                "total": 30
                            }
                        }
                    }))
                },
            ),
        );
        let client = stub_client(router).await;

        let list = client.list_products(12, 2).await.unwrap();
        assert_eq!(list.products[0].slug, "perfumes.example.com");
        let pagination = list.pagination.clone().unwrap();
        assert_eq!(pagination.page, Some(2));
        assert_eq!(pagination.limit, Some(12));
        assert_eq!(list.total_pages(2, 12), 3);
    }

    #[tokio::test]
    async fn test_get_product_is_cached() {
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/api/ecommerce/products/{slug}",
            get(move |Path(slug): Path<String>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Json(json!({ "success": true, "data": { "product": product_json(&slug) } }))
                }
            }),
        );
        let client = stub_client(router).await;

        let first = client.get_product("oud-royale").await.unwrap();
        let second = client.get_product("oud-royale").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_envelope_is_parsed() {
        let router = Router::new().route(
            "/api/ecommerce/products/{slug}",
            get(|| async {
                (
                    axum::http::StatusCode::NOT_FOUND,
                    Json(json!({
                        "success": false,
                        "error": { "message": "Product not found", "code": "NOT_FOUND" }
                    })),
                )
            }),
        );
        let client = stub_client(router).await;

        let err = client.get_product("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Product not found");
        assert_eq!(err.code(), Some(&ApiErrorCode::NotFound));
    }

    #[tokio::test]
    async fn test_success_false_with_ok_status_is_an_error() {
        let router = Router::new().route(
            "/api/ecommerce/orders",
            post(|| async {
                Json(json!({
                    "success": false,
                    "error": {
                        "message": "Insufficient stock",
                        "code": "INSUFFICIENT_STOCK",
                        "details": { "available": 1 }
                    }
                }))
            }),
        );
        let client = stub_client(router).await;

        let request = CreateOrderRequest {
            customer: OrderCustomer {
                email: perfumery_core::Email::parse("ada@example.com").unwrap(),
                first_name: "Ada".to_string(),
                last_name: "Obi".to_string(),
                phone: "08031234567".to_string(),
            },
            items: vec![OrderItem {
                product_id: perfumery_core::ProductId::new("p1"),
                quantity: 5,
            }],
            shipping_method: perfumery_core::ShippingMethod::Pickup,
            shipping_address: None,
            notes: None,
        };
        let err = client.create_order(&request).await.unwrap_err();
        assert!(err.is_client_error());
        match err {
            ApiError::Api { status, details, .. } => {
                assert_eq!(status, 200);
                assert_eq!(details.unwrap()["available"], 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let router = Router::new().route(
            "/api/ecommerce/products",
            get(|| async {
                (
                    axum::http::StatusCode::TOO_MANY_REQUESTS,
                    [
                        (RATE_LIMIT_LIMIT_HEADER, "100"),
                        (RATE_LIMIT_REMAINING_HEADER, "0"),
                        (RATE_LIMIT_RESET_HEADER, "1767225600"),
                    ],
                    Json(json!({
                        "success": false,
                        "error": { "message": "Too many requests", "code": "RATE_LIMIT_EXCEEDED" }
                    })),
                )
                    .into_response()
            }),
        );
        let client = stub_client(router).await;

        match client.list_products(12, 1).await.unwrap_err() {
            ApiError::RateLimited { message, info } => {
                assert_eq!(message, "Too many requests");
                assert_eq!(info.limit, Some(100));
                assert!(info.is_exhausted());
                assert_eq!(info.reset, Some(1_767_225_600));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_payment_initialize_and_verify() {
        let router = Router::new()
            .route(
                "/orders/{order_id}/initialize-payment",
                post(|Path(order_id): Path<String>, Json(body): Json<Value>| async move {
                    Json(json!({
                        "success": true,
                        "data": {
                            "authorizationUrl": format!("https://checkout.paystack.com/{order_id}"),
                            "accessCode": "acc_1",
                            "reference": body["callbackUrl"]
                                .as_str()
                                .unwrap_or_default()
                                .len()
                                .to_string()
                        }
                    }))
                }),
            )
            .route(
                "/orders/{order_id}/verify-payment",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "success": true,
                        "data": {
                            "reference": q.get("reference").cloned().unwrap_or_default(),
                            "amount": 2_500_000,
                            "currency": "NGN",
                            "status": "success",
                            "paidAt": "2026-10-19T09:00:00Z"
                        }
                    }))
                }),
            );
        let client = stub_client(router).await;
        let order_id = OrderId::new("ord_42");

        let init = client
            .initialize_payment(&order_id, "ada@example.com", "http://shop/cb")
            .await
            .unwrap();
        assert_eq!(init.authorization_url, "https://checkout.paystack.com/ord_42");
        assert_eq!(init.reference.as_str(), "14");

        let verification = client
            .verify_payment(&order_id, &PaymentReference::new("ref_9"))
            .await
            .unwrap();
        assert_eq!(verification.reference.as_str(), "ref_9");
        assert!(verification.status.is_successful());
    }

    #[test]
    fn test_error_from_non_json_body() {
        let err = error_from_body(502, "Bad Gateway");
        assert_eq!(err.user_message(), "Request failed with status 502");
        assert!(err.code().is_none());
    }

    #[test]
    fn test_rate_limit_headers_absent() {
        let info = RateLimitInfo::from_headers(&HeaderMap::new());
        assert!(!info.is_present());
        assert!(!info.is_exhausted());
    }
}
