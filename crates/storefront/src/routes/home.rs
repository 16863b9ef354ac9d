//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::Page;
use super::products::ProductCard;
use crate::analytics::{AnalyticsItem, EcommerceEvent};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session::load_cart;
use crate::seo::SeoMeta;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_PRODUCTS: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub featured: Vec<ProductCard>,
}

/// Display the home page.
///
/// A catalogue outage leaves the featured grid empty rather than failing
/// the page.
#[instrument(skip(state, session, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let config = state.config();
    let products = state
        .api()
        .list_products(FEATURED_PRODUCTS, 1)
        .await
        .map_or_else(
            |e| {
                tracing::error!("Failed to fetch featured products: {e}");
                Vec::new()
            },
            |list| list.products,
        );

    let cart = load_cart(&session).await;
    let mut page = Page::new(&state, SeoMeta::home(config), nonce, &cart);
    if !products.is_empty() {
        page.analytics.push(&EcommerceEvent::ViewItemList {
            list_name: "Featured".to_string(),
            items: products
                .iter()
                .map(|p| AnalyticsItem::from_product(p, 1))
                .collect(),
        });
    }

    HomeTemplate {
        page,
        featured: products
            .iter()
            .map(|p| ProductCard::new(p, &config.store))
            .collect(),
    }
}
