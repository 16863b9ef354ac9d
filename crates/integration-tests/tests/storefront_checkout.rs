//! Integration tests for the checkout wizard and the Paystack hand-off.

#![allow(clippy::unwrap_used)]

use perfumery_integration_tests::{
    STUB_AUTHORIZATION_URL, STUB_ORDER_ID, STUB_REFERENCE, TestContext, location,
};

// =============================================================================
// Wizard navigation
// =============================================================================

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_to_cart() {
    let ctx = TestContext::new().await;
    for path in ["/checkout", "/checkout/customer", "/checkout/payment"] {
        let response = ctx.get(path).await;
        assert_eq!(location(&response), Some("/cart"), "{path}");
    }
}

#[tokio::test]
async fn test_later_steps_are_locked_until_earlier_ones_are_valid() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;

    let response = ctx.get("/checkout").await;
    assert_eq!(location(&response), Some("/checkout/customer"));

    let response = ctx.get("/checkout/payment").await;
    assert_eq!(location(&response), Some("/checkout/customer"));

    let response = ctx.get("/checkout/customer").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("<span>1. Your details</span>"));
    assert!(body.contains("<span>2. Delivery</span>"));
    assert!(body.contains("<span>3. Payment</span>"));
}

#[tokio::test]
async fn test_step_indicator_links_completed_steps() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;

    let body = ctx.get("/checkout/payment").await.text().await.unwrap();
    assert!(body.contains("<a href=\"/checkout/customer\">1. Your details</a>"));
    assert!(body.contains("<a href=\"/checkout/delivery\">2. Delivery</a>"));
    assert!(body.contains("<span>3. Payment</span>"));
}

#[tokio::test]
async fn test_invalid_customer_details_are_shown_inline() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;

    let response = ctx
        .post_form(
            "/checkout/customer",
            &[("email", "not-an-email"), ("first_name", "Ada"), ("last_name", ""), ("phone", "12")],
        )
        .await;
    assert_eq!(response.status(), 422);

    let body = response.text().await.unwrap();
    assert!(body.contains("Please correct the fields below."));
    assert!(body.contains("value=\"Ada\""));

    let response = ctx.get("/checkout/delivery").await;
    assert_eq!(location(&response), Some("/checkout/customer"));
}

#[tokio::test]
async fn test_home_delivery_requires_an_address() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.post_form(
        "/checkout/customer",
        &[
            ("email", "ada@example.com"),
            ("first_name", "Ada"),
            ("last_name", "Obi"),
            ("phone", "08031234567"),
        ],
    )
    .await;

    let response = ctx
        .post_form("/checkout/delivery", &[("method", "delivery")])
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn test_back_returns_to_previous_step() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;

    let response = ctx.post_form("/checkout/back", &[]).await;
    assert_eq!(location(&response), Some("/checkout/delivery"));

    let body = ctx.get("/checkout/delivery").await.text().await.unwrap();
    assert!(body.contains("value=\"pickup\" checked"));
}

// =============================================================================
// Payment
// =============================================================================

#[tokio::test]
async fn test_payment_step_reviews_details() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "2").await;
    ctx.complete_details().await;

    let response = ctx.get("/checkout/payment").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("Ada Obi"));
    assert!(body.contains("ada@example.com"));
    assert!(body.contains("+2348031234567") || body.contains("08031234567"));
    assert!(body.contains("Review and pay"));
}

#[tokio::test]
async fn test_pay_creates_order_and_redirects_to_paystack() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "2").await;
    ctx.complete_details().await;

    let response = ctx.post_form("/checkout/payment", &[]).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), Some(STUB_AUTHORIZATION_URL));

    let orders = ctx.api.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order["customer"]["email"], "ada@example.com");
    assert_eq!(order["shippingMethod"], "pickup");
    assert_eq!(order["items"][0]["productId"], "p-oud-royale");
    assert_eq!(order["items"][0]["quantity"], 2);
    assert!(order.get("shippingAddress").is_none());

    let init = &ctx.api.payment_initializations()[0];
    assert_eq!(init["email"], "ada@example.com");
    assert_eq!(
        init["callbackUrl"],
        format!("http://localhost:3000/checkout/callback?orderId={STUB_ORDER_ID}")
    );
}

#[tokio::test]
async fn test_paying_again_reuses_the_order() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;

    ctx.post_form("/checkout/payment", &[]).await;
    ctx.post_form("/checkout/payment", &[]).await;
    assert_eq!(ctx.api.orders().len(), 1);
    assert_eq!(ctx.api.payment_initializations().len(), 2);
}

#[tokio::test]
async fn test_cart_change_discards_the_order() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;
    ctx.post_form("/checkout/payment", &[]).await;

    ctx.add_to_cart("oud-royale", "1").await;
    ctx.post_form("/checkout/payment", &[]).await;

    let orders = ctx.api.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1]["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_successful_callback_clears_cart() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;
    ctx.post_form("/checkout/payment", &[]).await;

    let response = ctx
        .get(&format!(
            "/checkout/callback?orderId={STUB_ORDER_ID}&reference={STUB_REFERENCE}&trxref={STUB_REFERENCE}"
        ))
        .await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("Thank you for your order"));
    assert!(body.contains(STUB_REFERENCE));
    assert!(body.contains("45000.50"));
    assert_eq!(ctx.api.verifications(), vec![STUB_REFERENCE.to_string()]);

    let count = ctx.get("/cart/count").await.text().await.unwrap();
    assert_eq!(count.trim(), "0");
    let response = ctx.get("/checkout").await;
    assert_eq!(location(&response), Some("/cart"));
}

#[tokio::test]
async fn test_callback_falls_back_to_trxref() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;
    ctx.post_form("/checkout/payment", &[]).await;

    let response = ctx.get("/checkout/callback?trxref=T555").await;
    assert_eq!(response.status(), 200);
    assert_eq!(ctx.api.verifications(), vec!["T555".to_string()]);
}

#[tokio::test]
async fn test_failed_payment_keeps_cart_for_retry() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("oud-royale", "1").await;
    ctx.complete_details().await;
    ctx.post_form("/checkout/payment", &[]).await;

    let response = ctx
        .get(&format!("/checkout/callback?orderId={STUB_ORDER_ID}&reference=failed-1"))
        .await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("Payment failed"));
    assert!(body.contains("Try again"));

    let count = ctx.get("/cart/count").await.text().await.unwrap();
    assert_eq!(count.trim(), "1");
}

#[tokio::test]
async fn test_callback_without_reference_is_rejected() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/checkout/callback").await;
    assert_eq!(response.status(), 400);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("We could not find a payment to verify.")
    );
    assert!(ctx.api.verifications().is_empty());
}

#[tokio::test]
async fn test_callback_for_unknown_order_shows_api_message() {
    let ctx = TestContext::new().await;
    let response = ctx
        .get("/checkout/callback?orderId=missing&reference=T1")
        .await;
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().contains("Order not found"));
}
