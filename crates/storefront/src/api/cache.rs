//! Cache types for catalogue responses.
//!
//! Only read-only catalogue data is cached. Orders and payments always hit
//! the API.

use super::types::{Product, ProductList};

/// Cache key for products and product pages.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    Products { limit: u32, page: u32 },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductList),
}
