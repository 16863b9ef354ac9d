//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Page;
use crate::analytics::{AnalyticsItem, EcommerceEvent};
use crate::api::Product;
use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session::load_cart;
use crate::seo::{SeoMeta, plain_text_excerpt};
use crate::state::AppState;

/// Product card data for listings.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub slug: String,
    pub name: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub in_stock: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, store: &StoreConfig) -> Self {
        let symbol = &store.currency_symbol;
        let image = product.featured_image();
        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            brand: product.brand.as_ref().map(|b| b.name().to_string()),
            size: product.size.clone(),
            price: product.price_in(store.currency).display_with(symbol),
            compare_at_price: product
                .sale_reference_price()
                .map(|p| perfumery_core::Price::new(p, store.currency).display_with(symbol)),
            image_url: image.map(|i| i.url().to_string()),
            image_alt: image
                .and_then(|i| i.alt())
                .unwrap_or(&product.name)
                .to_string(),
            in_stock: product.in_stock(),
        }
    }
}

/// Product detail data for templates.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub card: ProductCard,
    /// Description with markup stripped
    pub description: String,
    pub category: Option<String>,
    pub gallery: Vec<String>,
    /// Units left when stock is low enough to mention
    pub low_stock: Option<u32>,
}

/// Stock level at or below which the product page shows a count.
const LOW_STOCK_THRESHOLD: u32 = 5;

impl ProductDetail {
    fn new(product: &Product, store: &StoreConfig) -> Self {
        Self {
            card: ProductCard::new(product, store),
            description: plain_text_excerpt(&product.description, usize::MAX),
            category: product.category.as_ref().map(|c| c.name().to_string()),
            gallery: product
                .images
                .iter()
                .skip(1)
                .map(|i| i.url().to_string())
                .collect(),
            low_stock: product
                .stock
                .filter(|s| (1..=LOW_STOCK_THRESHOLD).contains(s)),
        }
    }
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
    pub current_page: u32,
    pub total_pages: u32,
}

impl ProductsIndexTemplate {
    #[must_use]
    pub const fn previous_page(&self) -> Option<u32> {
        if self.current_page > 1 {
            Some(self.current_page - 1)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn next_page(&self) -> Option<u32> {
        if self.current_page < self.total_pages {
            Some(self.current_page + 1)
        } else {
            None
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: ProductDetail,
    pub in_cart: u32,
}

/// Display product listing page.
///
/// # Errors
///
/// Returns an error if the catalogue cannot be fetched.
#[instrument(skip(state, session, nonce))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let config = state.config();
    let current_page = query.page.unwrap_or(1).max(1);
    let limit = config.store.products_per_page;

    let list = state.api().list_products(limit, current_page).await?;
    let total_pages = list.total_pages(current_page, limit);

    let cart = load_cart(&session).await;
    let mut page = Page::new(
        &state,
        SeoMeta::product_list(config, current_page),
        nonce,
        &cart,
    );
    page.analytics.push(&EcommerceEvent::ViewItemList {
        list_name: "All fragrances".to_string(),
        items: list
            .products
            .iter()
            .map(|p| AnalyticsItem::from_product(p, 1))
            .collect(),
    });

    Ok(ProductsIndexTemplate {
        page,
        products: list
            .products
            .iter()
            .map(|p| ProductCard::new(p, &config.store))
            .collect(),
        current_page,
        total_pages,
    })
}

/// Display product detail page.
///
/// # Errors
///
/// Returns 404 if the product does not exist, or an error if the API fails.
#[instrument(skip(state, session, nonce), fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let config = state.config();
    let product = state.api().get_product(&slug).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound(format!("Product {slug}"))
        } else {
            AppError::Api(e)
        }
    })?;

    let cart = load_cart(&session).await;
    let mut page = Page::new(&state, SeoMeta::product(config, &product), nonce, &cart);
    page.analytics.push(&EcommerceEvent::ViewItem {
        item: AnalyticsItem::from_product(&product, 1),
    });

    Ok(ProductShowTemplate {
        page,
        in_cart: cart.quantity_of(&product.id),
        product: ProductDetail::new(&product, &config.store),
    })
}
