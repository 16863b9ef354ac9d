//! Session cart and order summary.
//!
//! Prices on cart lines are copied from the catalogue when the line is added.
//! The commerce API re-prices the order on creation, so these totals are for
//! display only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shipping::ShippingMethod;
use crate::types::{CurrencyCode, Price, ProductId};

/// Upper bound on a single line's quantity.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// A single product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The customer's cart, stored in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Add a line, merging with an existing line for the same product.
    ///
    /// Returns the resulting quantity for that product, capped at
    /// [`MAX_LINE_QUANTITY`].
    pub fn add(&mut self, line: CartLine) -> u32 {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing
                .quantity
                .saturating_add(line.quantity)
                .min(MAX_LINE_QUANTITY);
            existing.unit_price = line.unit_price;
            return existing.quantity;
        }

        let quantity = line.quantity.clamp(1, MAX_LINE_QUANTITY);
        self.lines.push(CartLine { quantity, ..line });
        quantity
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self.lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity.min(MAX_LINE_QUANTITY);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if it was not present.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        self.lines.len() != before
    }

    /// Quantity already in the cart for a product.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| &l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self, currency: CurrencyCode) -> Price {
        Price::new(self.lines.iter().map(CartLine::line_total).sum(), currency)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// A line as shown in the order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub name: String,
    pub quantity: u32,
    pub line_total: Price,
}

/// Totals shown beside the checkout and on the cart page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub lines: Vec<SummaryLine>,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    symbol: String,
}

impl OrderSummary {
    /// Compute the summary for a cart and shipping method.
    ///
    /// Pickup is always free; delivery charges `delivery_fee` once per order.
    #[must_use]
    pub fn new(
        cart: &Cart,
        currency: CurrencyCode,
        symbol: &str,
        method: ShippingMethod,
        delivery_fee: Decimal,
    ) -> Self {
        let subtotal = cart.subtotal(currency);
        let shipping_fee = match method {
            ShippingMethod::Delivery if !cart.is_empty() => Price::new(delivery_fee, currency),
            _ => Price::zero(currency),
        };
        let total = Price::new(subtotal.amount + shipping_fee.amount, currency);

        Self {
            lines: cart
                .lines
                .iter()
                .map(|l| SummaryLine {
                    name: l.name.clone(),
                    quantity: l.quantity,
                    line_total: Price::new(l.unit_price, currency).times(l.quantity),
                })
                .collect(),
            subtotal,
            shipping_fee,
            total,
            symbol: symbol.to_string(),
        }
    }

    #[must_use]
    pub fn subtotal_display(&self) -> String {
        self.subtotal.display_with(&self.symbol)
    }

    #[must_use]
    pub fn shipping_display(&self) -> String {
        if self.shipping_fee.amount.is_zero() {
            "Free".to_string()
        } else {
            self.shipping_fee.display_with(&self.symbol)
        }
    }

    #[must_use]
    pub fn total_display(&self) -> String {
        self.total.display_with(&self.symbol)
    }

    /// Format any amount with this summary's symbol.
    #[must_use]
    pub fn format(&self, price: &Price) -> String {
        price.display_with(&self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            slug: id.to_string(),
            name: format!("Perfume {id}"),
            unit_price: Decimal::new(price, 2),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::default();
        cart.add(line("a", 1000, 1));
        assert_eq!(cart.add(line("a", 1000, 2)), 3);
        cart.add(line("b", 500, 1));
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_quantity_is_capped() {
        let mut cart = Cart::default();
        cart.add(line("a", 100, 90));
        assert_eq!(cart.add(line("a", 100, 20)), MAX_LINE_QUANTITY);
        assert!(cart.set_quantity(&ProductId::new("a"), 500));
        assert_eq!(cart.quantity_of(&ProductId::new("a")), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        cart.add(line("a", 100, 2));
        assert!(cart.set_quantity(&ProductId::new("a"), 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(&ProductId::new("missing"), 1));
    }

    #[test]
    fn test_summary_with_delivery_fee() {
        let mut cart = Cart::default();
        cart.add(line("a", 1_250_000, 2)); // 12,500.00 each
        cart.add(line("b", 799_999, 1)); // 7,999.99

        let summary = OrderSummary::new(
            &cart,
            CurrencyCode::NGN,
            "₦",
            ShippingMethod::Delivery,
            Decimal::from(2500),
        );
        assert_eq!(
            summary.lines[0].line_total,
            Price::new(Decimal::from(25_000), CurrencyCode::NGN)
        );
        assert_eq!(summary.subtotal_display(), "₦32999.99");
        assert_eq!(summary.shipping_display(), "₦2500.00");
        assert_eq!(summary.total_display(), "₦35499.99");
    }

    #[test]
    fn test_summary_pickup_is_free() {
        let mut cart = Cart::default();
        cart.add(line("a", 1000, 3));

        let summary = OrderSummary::new(
            &cart,
            CurrencyCode::USD,
            "$",
            ShippingMethod::Pickup,
            Decimal::from(15),
        );
        assert_eq!(summary.subtotal_display(), "$30.00");
        assert_eq!(summary.shipping_display(), "Free");
        assert_eq!(summary.total_display(), "$30.00");
    }

    #[test]
    fn test_empty_cart_summary_is_zero() {
        let summary = OrderSummary::new(
            &Cart::default(),
            CurrencyCode::NGN,
            "₦",
            ShippingMethod::Delivery,
            Decimal::from(2500),
        );
        assert_eq!(summary.subtotal_display(), "₦0.00");
        assert_eq!(summary.total_display(), "₦0.00");
    }
}
