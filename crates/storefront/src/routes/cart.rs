//! Cart route handlers.
//!
//! The cart lives in the session. Mutations are HTMX requests that return a
//! fragment plus an `HX-Trigger` header carrying `cart-updated` (and the GA4
//! event, when tracking is on). Plain form posts are redirected to the cart
//! page so the product page still works without JavaScript.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use perfumery_core::{
    Cart, CartLine, OrderSummary, Price, ProductId, ShippingMethod, cart::MAX_LINE_QUANTITY,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Page, is_htmx};
use crate::analytics::{AnalyticsItem, EcommerceEvent, hx_trigger};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session::{invalidate_order, load_cart, load_draft, save_cart};
use crate::seo::SeoMeta;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub slug: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub summary: OrderSummary,
    pub max_quantity: u32,
}

impl CartView {
    /// Build the view, pricing shipping for the method chosen so far.
    #[must_use]
    pub fn new(cart: &Cart, state: &AppState, shipping: ShippingMethod) -> Self {
        let store = &state.config().store;
        let summary = OrderSummary::new(
            cart,
            store.currency,
            &store.currency_symbol,
            shipping,
            store.delivery_fee,
        );
        let format = |amount| summary.format(&Price::new(amount, store.currency));
        let items = cart
            .lines
            .iter()
            .map(|line| CartItemView {
                product_id: line.product_id.to_string(),
                slug: line.slug.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: format(line.unit_price),
                line_total: format(line.line_total()),
                image_url: line.image_url.clone(),
            })
            .collect();

        Self {
            items,
            item_count: cart.item_count(),
            summary,
            max_quantity: MAX_LINE_QUANTITY,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub slug: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Inline notice fragment, e.g. for stock problems.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_notice.html")]
pub struct CartNoticeTemplate {
    pub message: String,
}

/// Why an item could not be added.
fn stock_problem(requested: u32, in_cart: u32, stock: Option<u32>) -> Option<String> {
    match stock {
        Some(0) => Some("This fragrance is out of stock.".to_string()),
        Some(stock) if in_cart.saturating_add(requested) > stock => Some(if in_cart > 0 {
            format!("Only {stock} available and you already have {in_cart} in your cart.")
        } else {
            format!("Only {stock} available.")
        }),
        _ => None,
    }
}

async fn shipping_method(session: &Session, state: &AppState) -> ShippingMethod {
    load_draft(session)
        .await
        .shipping_method(state.config().store.default_shipping)
}

async fn persist(session: &Session, cart: &Cart) -> Result<()> {
    save_cart(session, cart).await?;
    invalidate_order(session).await?;
    Ok(())
}

fn with_trigger(trigger: HeaderValue, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    response.headers_mut().insert("hx-trigger", trigger);
    response
}

/// Display cart page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    let method = shipping_method(&session, &state).await;
    let seo = SeoMeta::private(state.config(), "Your cart", "/cart");

    CartShowTemplate {
        page: Page::new(&state, seo, nonce, &cart),
        cart: CartView::new(&cart, &state, method),
    }
}

/// Add item to cart (HTMX).
///
/// Looks the product up by slug so the price always comes from the
/// catalogue, and refuses quantities beyond the reported stock.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched or the session cannot
/// be written.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let quantity = form.quantity.unwrap_or(1).clamp(1, MAX_LINE_QUANTITY);
    let product = state.api().get_product(&form.slug).await.map_err(|e| {
        if e.is_not_found() {
            AppError::BadRequest(format!("unknown product {}", form.slug))
        } else {
            AppError::Api(e)
        }
    })?;

    let mut cart = load_cart(&session).await;
    if let Some(message) = stock_problem(quantity, cart.quantity_of(&product.id), product.stock) {
        tracing::info!(slug = %product.slug, "Add to cart refused: {message}");
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            [("hx-retarget", "#add-to-cart-status")],
            CartNoticeTemplate { message },
        )
            .into_response());
    }

    cart.add(CartLine {
        product_id: product.id.clone(),
        slug: product.slug.clone(),
        name: product.name.clone(),
        unit_price: product.price,
        quantity,
        image_url: product.featured_image().map(|i| i.url().to_string()),
    });
    persist(&session, &cart).await?;

    if !is_htmx(&headers) {
        return Ok(Redirect::to("/cart").into_response());
    }

    let config = state.config();
    let event = EcommerceEvent::AddToCart {
        item: AnalyticsItem::from_product(&product, quantity),
    };
    Ok(with_trigger(
        hx_trigger(&config.analytics, config.store.currency, Some(&event)),
        CartCountTemplate {
            count: cart.item_count(),
        },
    ))
}

/// Update cart item quantity (HTMX). Zero removes the line.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await;
    let removed = if form.quantity == 0 {
        cart.lines.iter().find(|l| l.product_id == product_id).cloned()
    } else {
        None
    };

    if cart.set_quantity(&product_id, form.quantity) {
        persist(&session, &cart).await?;
    }

    let event = removed.map(|line| EcommerceEvent::RemoveFromCart {
        item: AnalyticsItem::from_line(&line),
    });
    items_response(&state, &session, &headers, &cart, event.as_ref()).await
}

/// Remove item from cart (HTMX).
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await;
    let removed = cart
        .lines
        .iter()
        .find(|l| l.product_id == product_id)
        .cloned();

    if cart.remove(&product_id) {
        persist(&session, &cart).await?;
    }

    let event = removed.map(|line| EcommerceEvent::RemoveFromCart {
        item: AnalyticsItem::from_line(&line),
    });
    items_response(&state, &session, &headers, &cart, event.as_ref()).await
}

async fn items_response(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    cart: &Cart,
    event: Option<&EcommerceEvent>,
) -> Result<Response> {
    if !is_htmx(headers) {
        return Ok(Redirect::to("/cart").into_response());
    }

    let config = state.config();
    let method = shipping_method(session, state).await;
    Ok(with_trigger(
        hx_trigger(&config.analytics, config.store.currency, event),
        CartItemsTemplate {
            cart: CartView::new(cart, state, method),
        },
    ))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_problem() {
        assert_eq!(stock_problem(1, 0, None), None);
        assert_eq!(stock_problem(2, 1, Some(3)), None);
        assert_eq!(
            stock_problem(1, 0, Some(0)).as_deref(),
            Some("This fragrance is out of stock.")
        );
        assert_eq!(
            stock_problem(3, 0, Some(2)).as_deref(),
            Some("Only 2 available.")
        );
        assert_eq!(
            stock_problem(1, 2, Some(2)).as_deref(),
            Some("Only 2 available and you already have 2 in your cart.")
        );
    }
}
