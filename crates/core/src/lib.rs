//! Perfumery Core - Shared domain types for the storefront.
//!
//! This crate holds everything the storefront reasons about that does not
//! need I/O: prices and currencies, identifiers, payment and API error codes,
//! the cart, the shipping-method selector and the checkout wizard.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no HTTP clients,
//! no sessions, no templates. The `storefront` crate wires these into request
//! handlers and stores them in the session.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails and statuses
//! - [`shipping`] - Delivery/pickup selection
//! - [`cart`] - Cart lines and order summary totals
//! - [`checkout`] - The three-step checkout wizard

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod shipping;
pub mod types;

pub use cart::{Cart, CartLine, OrderSummary};
pub use checkout::{CheckoutDraft, CheckoutError, CheckoutStep, CustomerDetails, DeliveryDetails};
pub use shipping::{ShippingMethod, ShippingSelector};
pub use types::*;
