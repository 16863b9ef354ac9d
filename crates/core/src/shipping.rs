//! Shipping-method selection.
//!
//! The storefront offers home delivery or in-store pickup. The two are
//! mutually exclusive and a selection always exists: a [`ShippingSelector`]
//! starts from a configured default and can only ever move between the two
//! variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Delivery,
    Pickup,
}

impl ShippingMethod {
    /// Both methods, in display order.
    pub const ALL: [Self; 2] = [Self::Delivery, Self::Pickup];

    /// Wire and form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
        }
    }

    /// Label shown next to the radio button.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Delivery => "Home delivery",
            Self::Pickup => "Store pickup",
        }
    }

    /// Whether a shipping address must be collected.
    #[must_use]
    pub const fn requires_address(self) -> bool {
        matches!(self, Self::Delivery)
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a value that is neither `delivery` nor `pickup`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shipping method: {0}")]
pub struct UnknownShippingMethod(pub String);

impl FromStr for ShippingMethod {
    type Err = UnknownShippingMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            _ => Err(UnknownShippingMethod(s.to_string())),
        }
    }
}

/// Radio-group state for the delivery step.
///
/// Holds exactly one [`ShippingMethod`]; there is no "nothing selected"
/// state to represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSelector {
    selected: ShippingMethod,
}

impl ShippingSelector {
    /// Create a selector with the given initial method.
    #[must_use]
    pub const fn new(initial: ShippingMethod) -> Self {
        Self { selected: initial }
    }

    /// The current selection.
    #[must_use]
    pub const fn selected(&self) -> ShippingMethod {
        self.selected
    }

    /// Whether `method` is the current selection.
    #[must_use]
    pub fn is_selected(&self, method: ShippingMethod) -> bool {
        self.selected == method
    }

    /// Select a method.
    pub const fn select(&mut self, method: ShippingMethod) {
        self.selected = method;
    }

    /// Select from a submitted form value.
    ///
    /// Unknown values leave the selection unchanged. Returns the selection
    /// after the call.
    pub fn select_str(&mut self, value: &str) -> ShippingMethod {
        if let Ok(method) = value.parse() {
            self.selected = method;
        }
        self.selected
    }

    /// Options in display order, paired with whether each is selected.
    #[must_use]
    pub fn options(&self) -> Vec<(ShippingMethod, bool)> {
        ShippingMethod::ALL
            .iter()
            .map(|&method| (method, self.is_selected(method)))
            .collect()
    }
}

impl Default for ShippingSelector {
    fn default() -> Self {
        Self::new(ShippingMethod::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected_count(selector: &ShippingSelector) -> usize {
        selector
            .options()
            .iter()
            .filter(|(_, selected)| *selected)
            .count()
    }

    #[test]
    fn test_defaults_to_initial_method() {
        assert_eq!(
            ShippingSelector::new(ShippingMethod::Pickup).selected(),
            ShippingMethod::Pickup
        );
        assert_eq!(
            ShippingSelector::new(ShippingMethod::Delivery).selected(),
            ShippingMethod::Delivery
        );
    }

    #[test]
    fn test_exactly_one_selected_after_any_sequence() {
        let mut selector = ShippingSelector::new(ShippingMethod::Delivery);
        assert_eq!(selected_count(&selector), 1);

        for value in ["pickup", "delivery", "express", "", "PICKUP", "pickup"] {
            selector.select_str(value);
            assert_eq!(selected_count(&selector), 1, "after {value:?}");
        }
        assert_eq!(selector.selected(), ShippingMethod::Pickup);
    }

    #[test]
    fn test_unknown_value_keeps_selection() {
        let mut selector = ShippingSelector::new(ShippingMethod::Pickup);
        assert_eq!(selector.select_str("drone"), ShippingMethod::Pickup);
    }

    #[test]
    fn test_select_switches() {
        let mut selector = ShippingSelector::default();
        selector.select(ShippingMethod::Pickup);
        assert!(selector.is_selected(ShippingMethod::Pickup));
        assert!(!selector.is_selected(ShippingMethod::Delivery));
    }

    #[test]
    fn test_requires_address() {
        assert!(ShippingMethod::Delivery.requires_address());
        assert!(!ShippingMethod::Pickup.requires_address());
    }
}
