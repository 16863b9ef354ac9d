//! Page metadata for search engines and social previews.
//!
//! Every page template receives a [`SeoMeta`] and renders it in `<head>`
//! through `partials/seo.html`: title, description, canonical link, robots
//! directive, Open Graph and Twitter card tags, and optional JSON-LD.

use perfumery_core::CurrencyCode;
use rust_decimal::RoundingStrategy;
use serde_json::{Value, json};

use crate::api::Product;
use crate::config::StorefrontConfig;

/// Maximum meta description length (characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 160;

/// Metadata injected into a page's `<head>`.
#[derive(Debug, Clone)]
pub struct SeoMeta {
    pub site_name: String,
    /// Page title without the site suffix
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub image_url: Option<String>,
    /// Open Graph type (`website` or `product`)
    pub og_type: &'static str,
    pub noindex: bool,
    /// JSON-LD document, already escaped for embedding in `<script>`
    pub json_ld: Option<String>,
}

impl SeoMeta {
    fn base(config: &StorefrontConfig, title: &str, path: &str) -> Self {
        Self {
            site_name: config.store.site_name.clone(),
            title: title.to_string(),
            description: config.store.site_description.clone(),
            canonical_url: config.absolute_url(path),
            image_url: None,
            og_type: "website",
            noindex: false,
            json_ld: None,
        }
    }

    /// Home page metadata with an `OnlineStore` JSON-LD block.
    #[must_use]
    pub fn home(config: &StorefrontConfig) -> Self {
        let mut meta = Self::base(config, &config.store.site_name, "/");
        meta.json_ld = Some(embed_json(&json!({
            "@context": "https://schema.org",
            "@type": "OnlineStore",
            "name": config.store.site_name,
            "description": config.store.site_description,
            "url": config.absolute_url("/"),
        })));
        meta
    }

    /// Catalogue listing. Pages after the first canonicalise to themselves.
    #[must_use]
    pub fn product_list(config: &StorefrontConfig, page: u32) -> Self {
        if page > 1 {
            let mut meta = Self::base(
                config,
                &format!("All fragrances - Page {page}"),
                &format!("/products?page={page}"),
            );
            meta.description = format!("{} (page {page})", config.store.site_description);
            meta
        } else {
            Self::base(config, "All fragrances", "/products")
        }
    }

    /// Product detail with schema.org `Product` JSON-LD.
    #[must_use]
    pub fn product(config: &StorefrontConfig, product: &Product) -> Self {
        let path = format!("/products/{}", product.slug);
        let mut meta = Self::base(config, &product.name, &path);
        let excerpt = plain_text_excerpt(&product.description, MAX_DESCRIPTION_LENGTH);
        if !excerpt.is_empty() {
            meta.description = excerpt;
        }
        meta.image_url = product.featured_image().map(|i| i.url().to_string());
        meta.og_type = "product";
        meta.json_ld = Some(embed_json(&product_json_ld(
            config,
            product,
            &meta.description,
            config.store.currency,
        )));
        meta
    }

    /// Cart, checkout and payment result pages: never indexed.
    #[must_use]
    pub fn private(config: &StorefrontConfig, title: &str, path: &str) -> Self {
        let mut meta = Self::base(config, title, path);
        meta.noindex = true;
        meta
    }

    /// `<title>` content.
    #[must_use]
    pub fn full_title(&self) -> String {
        if self.title == self.site_name {
            self.title.clone()
        } else {
            format!("{} | {}", self.title, self.site_name)
        }
    }

    /// `<meta name="robots">` content.
    #[must_use]
    pub const fn robots(&self) -> &'static str {
        if self.noindex {
            "noindex, nofollow"
        } else {
            "index, follow"
        }
    }
}

fn product_json_ld(
    config: &StorefrontConfig,
    product: &Product,
    description: &str,
    currency: CurrencyCode,
) -> Value {
    let price = product
        .price
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let availability = if product.in_stock() {
        "https://schema.org/InStock"
    } else {
        "https://schema.org/OutOfStock"
    };

    let mut doc = json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": product.name,
        "description": description,
        "sku": product.id.as_str(),
        "image": product.images.iter().map(|i| i.url()).collect::<Vec<_>>(),
        "offers": {
            "@type": "Offer",
            "url": config.absolute_url(&format!("/products/{}", product.slug)),
            "price": format!("{price:.2}"),
            "priceCurrency": currency.code(),
            "availability": availability,
        },
    });
    if let (Some(brand), Some(obj)) = (&product.brand, doc.as_object_mut()) {
        obj.insert(
            "brand".to_string(),
            json!({ "@type": "Brand", "name": brand.name() }),
        );
    }
    doc
}

/// Serialize JSON for embedding inside a `<script>` element.
///
/// Escapes `<`, `>` and `&` so a string value can never close the script
/// tag or open an HTML comment.
#[must_use]
pub fn embed_json(value: &Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Strip tags, decode common entities, collapse whitespace and cut at a
/// word boundary.
#[must_use]
pub fn plain_text_excerpt(html: &str, max_chars: usize) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    let trimmed = cut
        .rfind(' ')
        .map_or(cut.as_str(), |idx| cut.get(..idx).unwrap_or(&cut));
    format!("{}…", trimmed.trim_end())
}
