//! Google Analytics 4 ecommerce events.
//!
//! Page handlers push events into an [`Analytics`] context that the base
//! template renders as `gtag('event', ...)` calls inside a CSP-nonced script.
//! HTMX endpoints (add to cart, remove from cart) have no page to render
//! into, so they send the event in an `HX-Trigger` header instead and
//! `static/js/analytics.js` forwards it to `gtag`.

use std::fmt::Write as _;

use axum::http::HeaderValue;
use perfumery_core::cart::CartLine;
use perfumery_core::{CurrencyCode, OrderSummary, ShippingMethod};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::{Value, json};

use crate::api::{PaymentVerification, Product};
use crate::config::AnalyticsConfig;
use crate::seo::embed_json;

/// HTMX event name the client-side forwarder listens for.
pub const HX_ANALYTICS_EVENT: &str = "analytics";

/// A GA4 `items[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsItem {
    pub item_id: String,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_category: Option<String>,
    pub price: f64,
    pub quantity: u32,
}

impl AnalyticsItem {
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            item_id: product.id.to_string(),
            item_name: product.name.clone(),
            item_brand: product.brand.as_ref().map(|b| b.name().to_string()),
            item_category: product.category.as_ref().map(|c| c.name().to_string()),
            price: to_f64(product.price),
            quantity,
        }
    }

    #[must_use]
    pub fn from_line(line: &CartLine) -> Self {
        Self {
            item_id: line.product_id.to_string(),
            item_name: line.name.clone(),
            item_brand: None,
            item_category: None,
            price: to_f64(line.unit_price),
            quantity: line.quantity,
        }
    }
}

/// The GA4 recommended ecommerce events the storefront emits.
#[derive(Debug, Clone, PartialEq)]
pub enum EcommerceEvent {
    ViewItemList {
        list_name: String,
        items: Vec<AnalyticsItem>,
    },
    ViewItem {
        item: AnalyticsItem,
    },
    AddToCart {
        item: AnalyticsItem,
    },
    RemoveFromCart {
        item: AnalyticsItem,
    },
    BeginCheckout {
        items: Vec<AnalyticsItem>,
        value: Decimal,
    },
    AddShippingInfo {
        items: Vec<AnalyticsItem>,
        value: Decimal,
        method: ShippingMethod,
    },
    AddPaymentInfo {
        items: Vec<AnalyticsItem>,
        value: Decimal,
    },
    Purchase {
        transaction_id: String,
        value: Decimal,
        shipping: Decimal,
        items: Vec<AnalyticsItem>,
    },
}

impl EcommerceEvent {
    /// Events for the lines of a cart.
    #[must_use]
    pub fn items_of(lines: &[CartLine]) -> Vec<AnalyticsItem> {
        lines.iter().map(AnalyticsItem::from_line).collect()
    }

    /// `begin_checkout` for a summary.
    #[must_use]
    pub fn begin_checkout(lines: &[CartLine], summary: &OrderSummary) -> Self {
        Self::BeginCheckout {
            items: Self::items_of(lines),
            value: summary.subtotal.amount,
        }
    }

    /// `purchase` for a verified payment.
    #[must_use]
    pub fn purchase(
        verification: &PaymentVerification,
        store_currency: CurrencyCode,
        shipping: Decimal,
        items: Vec<AnalyticsItem>,
    ) -> Self {
        Self::Purchase {
            transaction_id: verification.reference.to_string(),
            value: verification.price(store_currency).amount,
            shipping,
            items,
        }
    }

    /// GA4 event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ViewItemList { .. } => "view_item_list",
            Self::ViewItem { .. } => "view_item",
            Self::AddToCart { .. } => "add_to_cart",
            Self::RemoveFromCart { .. } => "remove_from_cart",
            Self::BeginCheckout { .. } => "begin_checkout",
            Self::AddShippingInfo { .. } => "add_shipping_info",
            Self::AddPaymentInfo { .. } => "add_payment_info",
            Self::Purchase { .. } => "purchase",
        }
    }

    /// GA4 event parameters.
    #[must_use]
    pub fn params(&self, currency: CurrencyCode) -> Value {
        let currency = currency.code();
        match self {
            Self::ViewItemList { list_name, items } => json!({
                "item_list_name": list_name,
                "currency": currency,
                "value": items
                    .iter()
                    .map(|i| i.price * f64::from(i.quantity))
                    .sum::<f64>(),
                "items": items,
            }),
            Self::ViewItem { item } | Self::AddToCart { item } | Self::RemoveFromCart { item } => {
                json!({
                    "currency": currency,
                    "value": item.price * f64::from(item.quantity),
                    "items": [item],
                })
            }
            Self::BeginCheckout { items, value } | Self::AddPaymentInfo { items, value } => {
                let mut params = json!({
                    "currency": currency,
                    "value": to_f64(*value),
                    "items": items,
                });
                if matches!(self, Self::AddPaymentInfo { .. }) {
                    params["payment_type"] = json!("paystack");
                }
                params
            }
            Self::AddShippingInfo {
                items,
                value,
                method,
            } => json!({
                "currency": currency,
                "value": to_f64(*value),
                "shipping_tier": method.as_str(),
                "items": items,
            }),
            Self::Purchase {
                transaction_id,
                value,
                shipping,
                items,
            } => json!({
                "transaction_id": transaction_id,
                "currency": currency,
                "value": to_f64(*value),
                "shipping": to_f64(*shipping),
                "items": items,
            }),
        }
    }
}

/// An event ready for the template.
#[derive(Debug, Clone)]
pub struct RenderedEvent {
    pub name: &'static str,
    /// Parameters, escaped for embedding in `<script>`
    pub params_json: String,
}

/// Per-page analytics context.
#[derive(Debug, Clone, Default)]
pub struct Analytics {
    pub measurement_id: Option<String>,
    currency: CurrencyCode,
    events: Vec<RenderedEvent>,
}

impl Analytics {
    #[must_use]
    pub fn new(config: &AnalyticsConfig, currency: CurrencyCode) -> Self {
        Self {
            measurement_id: config.ga4_measurement_id.clone(),
            currency,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.measurement_id.is_some()
    }

    /// Queue an event for this page. Dropped when tracking is disabled.
    pub fn push(&mut self, event: &EcommerceEvent) {
        if !self.enabled() {
            return;
        }
        self.events.push(RenderedEvent {
            name: event.name(),
            params_json: embed_json(&event.params(self.currency)),
        });
    }

    /// Builder form of [`Analytics::push`].
    #[must_use]
    pub fn with(mut self, event: &EcommerceEvent) -> Self {
        self.push(event);
        self
    }

    #[must_use]
    pub fn events(&self) -> &[RenderedEvent] {
        &self.events
    }

    /// `gtag` config call, escaped for `<script>`.
    #[must_use]
    pub fn measurement_id_json(&self) -> String {
        embed_json(&json!(self.measurement_id))
    }
}

/// Build an `HX-Trigger` header value carrying `cart-updated` and, when
/// tracking is enabled, an analytics event.
///
/// Header values must be visible ASCII, so non-ASCII characters in product
/// names are written as JSON `\u` escapes.
#[must_use]
pub fn hx_trigger(
    config: &AnalyticsConfig,
    currency: CurrencyCode,
    event: Option<&EcommerceEvent>,
) -> HeaderValue {
    let mut triggers = serde_json::Map::new();
    triggers.insert("cart-updated".to_string(), json!({}));
    if let (true, Some(event)) = (config.enabled(), event) {
        triggers.insert(
            HX_ANALYTICS_EVENT.to_string(),
            json!({ "name": event.name(), "params": event.params(currency) }),
        );
    }
    let json = ascii_json(&Value::Object(triggers).to_string());
    HeaderValue::from_str(&json).unwrap_or_else(|_| HeaderValue::from_static("cart-updated"))
}

/// Escape every non-ASCII (and DEL) character as a JSON `\u` sequence.
fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\x7f' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use perfumery_core::ProductId;

    use super::*;

    fn enabled() -> AnalyticsConfig {
        AnalyticsConfig {
            ga4_measurement_id: Some("G-TEST123".to_string()),
        }
    }

    fn line() -> CartLine {
        CartLine {
            product_id: ProductId::new("p1"),
            slug: "eau-de-néroli".to_string(),
            name: "Eau de Néroli".to_string(),
            unit_price: Decimal::new(1_250_050, 2),
            quantity: 2,
            image_url: None,
        }
    }

    #[test]
    fn test_add_to_cart_params() {
        let event = EcommerceEvent::AddToCart {
            item: AnalyticsItem::from_line(&line()),
        };
        let params = event.params(CurrencyCode::NGN);
        assert_eq!(event.name(), "add_to_cart");
        assert_eq!(params["currency"], "NGN");
        assert!((params["value"].as_f64().unwrap() - 25_001.0).abs() < 1e-6);
        assert_eq!(params["items"][0]["item_id"], "p1");
        assert!(params["items"][0].get("item_brand").is_none());
    }

    #[test]
    fn test_view_item_list_params() {
        let event = EcommerceEvent::ViewItemList {
            list_name: "Featured".to_string(),
            items: vec![
                AnalyticsItem::from_line(&line()),
                AnalyticsItem::from_line(&line()),
            ],
        };
        let params = event.params(CurrencyCode::NGN);
        assert_eq!(params["item_list_name"], "Featured");
        assert_eq!(params["currency"], "NGN");
        assert!((params["value"].as_f64().unwrap() - 50_002.0).abs() < 1e-6);
        assert_eq!(params["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_shipping_and_payment_params() {
        let items = EcommerceEvent::items_of(&[line()]);
        let shipping = EcommerceEvent::AddShippingInfo {
            items: items.clone(),
            value: Decimal::from(100),
            method: ShippingMethod::Pickup,
        };
        assert_eq!(shipping.params(CurrencyCode::NGN)["shipping_tier"], "pickup");

        let payment = EcommerceEvent::AddPaymentInfo {
            items,
            value: Decimal::from(100),
        };
        assert_eq!(payment.params(CurrencyCode::NGN)["payment_type"], "paystack");
    }

    #[test]
    fn test_disabled_context_drops_events() {
        let mut analytics = Analytics::new(&AnalyticsConfig::default(), CurrencyCode::NGN);
        analytics.push(&EcommerceEvent::ViewItemList {
            list_name: "All".to_string(),
            items: Vec::new(),
        });
        assert!(!analytics.enabled());
        assert!(analytics.events().is_empty());
    }

    #[test]
    fn test_enabled_context_renders_events() {
        let analytics = Analytics::new(&enabled(), CurrencyCode::NGN).with(
            &EcommerceEvent::ViewItemList {
                list_name: "<All>".to_string(),
                items: Vec::new(),
            },
        );
        let event = &analytics.events()[0];
        assert_eq!(event.name, "view_item_list");
        assert!(!event.params_json.contains('<'));
        assert_eq!(analytics.measurement_id_json(), "\"G-TEST123\"");
    }

    #[test]
    fn test_hx_trigger_is_ascii_and_round_trips() {
        let event = EcommerceEvent::AddToCart {
            item: AnalyticsItem::from_line(&line()),
        };
        let header = hx_trigger(&enabled(), CurrencyCode::NGN, Some(&event));
        let text = header.to_str().unwrap();
        assert!(text.is_ascii());

        let value: Value = serde_json::from_str(text).unwrap();
        assert!(value.get("cart-updated").is_some());
        assert_eq!(
            value["analytics"]["params"]["items"][0]["item_name"],
            "Eau de Néroli"
        );
    }

    #[test]
    fn test_hx_trigger_without_tracking() {
        let header = hx_trigger(&AnalyticsConfig::default(), CurrencyCode::NGN, None);
        assert_eq!(header.to_str().unwrap(), r#"{"cart-updated":{}}"#);
    }
}
