//! Integration tests for the public storefront pages.

#![allow(clippy::unwrap_used)]

use perfumery_integration_tests::TestContext;

// =============================================================================
// Infrastructure
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/health").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_robots_txt_keeps_crawlers_out_of_checkout() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/robots.txt").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("Disallow: /cart"));
    assert!(body.contains("Disallow: /checkout"));
}

#[tokio::test]
async fn test_security_headers_carry_a_nonce() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/health").await;

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));

    let csp = headers["content-security-policy"].to_str().unwrap();
    assert!(csp.contains("'nonce-"));
    assert!(csp.contains("https://checkout.paystack.com"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let ctx = TestContext::new().await;
    let response = ctx
        .client
        .get(ctx.url("/health"))
        .header("x-request-id", "edge-42")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "edge-42");
}

// =============================================================================
// Catalogue
// =============================================================================

#[tokio::test]
async fn test_home_features_products() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("Oud Royale"));
    assert!(body.contains("<link rel=\"canonical\" href=\"http://localhost:3000/\">"));
    assert_eq!(ctx.api.tenant_domains().first().map(String::as_str), Some("localhost"));
}

#[tokio::test]
async fn test_product_listing_marks_sold_out_items() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/products").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("/products/oud-royale"));
    assert!(body.contains("Rose Noir"));
    assert!(body.contains("Sold out"));
    assert!(body.contains("Maison Lune"));
}

#[tokio::test]
async fn test_product_page_shows_plain_description_and_structured_data() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/products/oud-royale").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("Smoky oud with rose and amber"));
    assert!(body.contains("application/ld+json"));
    assert!(body.contains("og:type\" content=\"product\""));
    assert!(body.contains("name=\"slug\" value=\"oud-royale\""));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/products/no-such-scent").await;
    assert_eq!(response.status(), 404);
}
