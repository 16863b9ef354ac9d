//! Wire types for the commerce REST API.
//!
//! The API is camelCase and not entirely consistent between endpoints
//! (`_id` vs `id`, bare vs `{ success, data }` wrapped bodies, images as
//! strings or objects). These types absorb the variation so route handlers
//! see one shape.

use chrono::{DateTime, Utc};
use perfumery_core::{
    Cart, CurrencyCode, CustomerDetails, DeliveryDetails, Email, OrderId, PaymentReference,
    PaymentStatus, Price, ProductId, ShippingMethod,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A response body that may or may not be wrapped in `{ success, data }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product image, sent either as a bare URL or as `{ url, alt }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProductImage {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        alt: Option<String>,
    },
}

impl ProductImage {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) | Self::Detailed { url, .. } => url,
        }
    }

    #[must_use]
    pub fn alt(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Detailed { alt, .. } => alt.as_deref(),
        }
    }
}

/// A brand or category reference, sent as a name or as `{ name, ... }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NamedRef {
    Name(String),
    Object { name: String },
}

impl NamedRef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

/// A catalogue product.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Units in stock; `None` when the API does not track inventory.
    #[serde(default, alias = "quantity", alias = "inventory")]
    pub stock: Option<u32>,
    #[serde(default)]
    pub brand: Option<NamedRef>,
    #[serde(default)]
    pub category: Option<NamedRef>,
    /// Fragrance size, e.g. "100ml".
    #[serde(default)]
    pub size: Option<String>,
}

impl Product {
    #[must_use]
    pub fn featured_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|s| s > 0)
    }

    #[must_use]
    pub fn price_in(&self, currency: CurrencyCode) -> Price {
        Price::new(self.price, currency)
    }

    /// `compare_at_price` when it is higher than the selling price.
    #[must_use]
    pub fn sale_reference_price(&self) -> Option<Decimal> {
        self.compare_at_price.filter(|p| *p > self.price)
    }
}

/// Pagination block of a product listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, alias = "pages")]
    pub total_pages: Option<u32>,
}

/// `data` of `GET /api/ecommerce/products`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl ProductList {
    /// Total pages, inferring from `total` and `limit` when `totalPages` is absent.
    ///
    /// Without any pagination info a full page implies there may be more.
    #[must_use]
    pub fn total_pages(&self, page: u32, limit: u32) -> u32 {
        let Some(pagination) = &self.pagination else {
            let full = u32::try_from(self.products.len()).unwrap_or(u32::MAX) >= limit;
            return if full { page.saturating_add(1) } else { page.max(1) };
        };
        if let Some(pages) = pagination.total_pages {
            return pages.max(1);
        }
        match (pagination.total, pagination.limit.unwrap_or(limit)) {
            (Some(total), limit) if limit > 0 => {
                u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX).max(1)
            }
            _ => page.max(1),
        }
    }
}

/// `data` of `GET /api/ecommerce/products/:slug`, wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductPayload {
    Wrapped { product: Product },
    Bare(Product),
}

impl ProductPayload {
    pub(crate) fn into_product(self) -> Product {
        match self {
            Self::Wrapped { product } | Self::Bare(product) => product,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Customer block of an order request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Shipping address block of an order request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAddress {
    pub address: String,
    pub city: String,
    pub state: String,
}

/// A line of an order request. Prices are set by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /api/ecommerce/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
    pub shipping_method: ShippingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<OrderAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    /// Build the order for a completed checkout draft.
    #[must_use]
    pub fn from_checkout(
        customer: &CustomerDetails,
        delivery: &DeliveryDetails,
        cart: &Cart,
    ) -> Self {
        let shipping_address = match (&delivery.address, &delivery.city, &delivery.state) {
            (Some(address), Some(city), Some(state)) if delivery.method.requires_address() => {
                Some(OrderAddress {
                    address: address.clone(),
                    city: city.clone(),
                    state: state.clone(),
                })
            }
            _ => None,
        };

        Self {
            customer: OrderCustomer {
                email: customer.email.clone(),
                first_name: customer.first_name.clone(),
                last_name: customer.last_name.clone(),
                phone: customer.phone.clone(),
            },
            items: cart
                .lines
                .iter()
                .map(|l| OrderItem {
                    product_id: l.product_id.clone(),
                    quantity: l.quantity,
                })
                .collect(),
            shipping_method: delivery.method,
            shipping_address,
            notes: delivery.notes.clone(),
        }
    }
}

/// An order as returned by the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderPayload {
    Wrapped { order: Order },
    Bare(Order),
}

impl OrderPayload {
    pub(crate) fn into_order(self) -> Order {
        match self {
            Self::Wrapped { order } | Self::Bare(order) => order,
        }
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Body of `POST /orders/:orderId/initialize-payment`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest<'a> {
    pub email: &'a str,
    pub callback_url: &'a str,
}

/// Response of `POST /orders/:orderId/initialize-payment`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitialization {
    #[serde(alias = "authorization_url")]
    pub authorization_url: String,
    #[serde(alias = "access_code")]
    pub access_code: String,
    pub reference: PaymentReference,
}

/// Payment result mirrored from the gateway by
/// `GET /orders/:orderId/verify-payment`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub reference: PaymentReference,
    /// Amount in minor units (kobo), as the gateway reports it.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(default, alias = "paid_at")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentVerification {
    /// Amount in major units, falling back to `store_currency` for codes the
    /// storefront does not know.
    #[must_use]
    pub fn price(&self, store_currency: CurrencyCode) -> Price {
        let currency = self.currency.parse().unwrap_or(store_currency);
        Price::from_minor_units(self.amount, currency)
    }
}
