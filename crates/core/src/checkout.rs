//! The checkout wizard.
//!
//! Checkout is a fixed three-step progression:
//!
//! ```text
//! Customer ──submit──▶ Delivery ──submit──▶ Payment
//!    ◀──────back──────    ◀──────back──────
//! ```
//!
//! A step can only be entered once every earlier step holds valid data, and
//! `back` moves exactly one step (it is a no-op on the first step). The draft
//! lives in the session and is discarded once payment is verified.

use serde::{Deserialize, Serialize};

use crate::shipping::{ShippingMethod, ShippingSelector};
use crate::types::{Email, OrderId, PaymentReference};

const MAX_NAME_LENGTH: usize = 100;
const MAX_ADDRESS_LENGTH: usize = 300;
const MAX_NOTES_LENGTH: usize = 500;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// A step of the checkout wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    #[default]
    Customer,
    Delivery,
    Payment,
}

impl CheckoutStep {
    /// All steps in order.
    pub const ALL: [Self; 3] = [Self::Customer, Self::Delivery, Self::Payment];

    /// One-based position, for the progress indicator.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Customer => 1,
            Self::Delivery => 2,
            Self::Payment => 3,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Customer => "Your details",
            Self::Delivery => "Delivery",
            Self::Payment => "Payment",
        }
    }

    /// URL path segment under `/checkout`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Delivery => "delivery",
            Self::Payment => "payment",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Customer => Some(Self::Delivery),
            Self::Delivery => Some(Self::Payment),
            Self::Payment => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Customer => None,
            Self::Delivery => Some(Self::Customer),
            Self::Payment => Some(Self::Delivery),
        }
    }
}

/// A validation failure on a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Errors from wizard transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// Submitted data failed validation.
    #[error("{} field(s) need attention", .0.len())]
    Invalid(Vec<FieldError>),
    /// An earlier step has not been completed.
    #[error("complete the {} step first", .0.title())]
    StepLocked(CheckoutStep),
}

impl CheckoutError {
    /// Field errors, if this is a validation failure.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Invalid(errors) => errors,
            Self::StepLocked(_) => &[],
        }
    }
}

/// Raw customer form input. Missing fields read as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Validated customer details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl CustomerDetails {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The details as form input, for re-populating the step.
    #[must_use]
    pub fn to_input(&self) -> CustomerInput {
        CustomerInput {
            email: self.email.to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
        }
    }
}

impl CustomerInput {
    /// Validate every field, collecting all failures.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Invalid`] listing each failing field.
    pub fn validate(&self) -> Result<CustomerDetails, CheckoutError> {
        let mut errors = Vec::new();

        let email = Email::parse(&self.email)
            .map_err(|e| errors.push(field_error("email", format!("Email: {e}"))))
            .ok();
        let first_name = required_text(
            &self.first_name,
            "first_name",
            "First name",
            MAX_NAME_LENGTH,
            &mut errors,
        );
        let last_name = required_text(
            &self.last_name,
            "last_name",
            "Last name",
            MAX_NAME_LENGTH,
            &mut errors,
        );
        let phone = normalize_phone(&self.phone)
            .map_err(|message| errors.push(field_error("phone", message)))
            .ok();

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok(CustomerDetails {
                email,
                first_name,
                last_name,
                phone,
            }),
            _ => Err(CheckoutError::Invalid(errors)),
        }
    }
}

/// Raw delivery form input. Missing fields read as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryInput {
    pub method: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub notes: String,
}

/// Validated delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub method: ShippingMethod,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub notes: Option<String>,
}

impl DeliveryDetails {
    /// The details as form input, for re-populating the step.
    #[must_use]
    pub fn to_input(&self) -> DeliveryInput {
        DeliveryInput {
            method: self.method.as_str().to_string(),
            address: self.address.clone().unwrap_or_default(),
            city: self.city.clone().unwrap_or_default(),
            state: self.state.clone().unwrap_or_default(),
            notes: self.notes.clone().unwrap_or_default(),
        }
    }
}

impl DeliveryInput {
    /// Validate the input. The method falls back to `default_method` when the
    /// submitted value is not recognised.
    ///
    /// Address, city and state are required for delivery and ignored for
    /// pickup.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Invalid`] listing each failing field.
    pub fn validate(
        &self,
        default_method: ShippingMethod,
    ) -> Result<DeliveryDetails, CheckoutError> {
        let mut selector = ShippingSelector::new(default_method);
        let method = selector.select_str(&self.method);
        let mut errors = Vec::new();

        let notes = optional_text(&self.notes, "notes", "Notes", MAX_NOTES_LENGTH, &mut errors);

        let (address, city, state) = if method.requires_address() {
            (
                Some(required_text(
                    &self.address,
                    "address",
                    "Address",
                    MAX_ADDRESS_LENGTH,
                    &mut errors,
                )),
                Some(required_text(&self.city, "city", "City", MAX_NAME_LENGTH, &mut errors)),
                Some(required_text(&self.state, "state", "State", MAX_NAME_LENGTH, &mut errors)),
            )
        } else {
            (None, None, None)
        };

        if !errors.is_empty() {
            return Err(CheckoutError::Invalid(errors));
        }

        Ok(DeliveryDetails {
            method,
            address,
            city,
            state,
            notes,
        })
    }
}

/// Session-held state of an in-progress checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    step: CheckoutStep,
    customer: Option<CustomerDetails>,
    delivery: Option<DeliveryDetails>,
    order_id: Option<OrderId>,
    payment_reference: Option<PaymentReference>,
}

impl CheckoutDraft {
    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn customer(&self) -> Option<&CustomerDetails> {
        self.customer.as_ref()
    }

    #[must_use]
    pub const fn delivery(&self) -> Option<&DeliveryDetails> {
        self.delivery.as_ref()
    }

    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    #[must_use]
    pub const fn payment_reference(&self) -> Option<&PaymentReference> {
        self.payment_reference.as_ref()
    }

    /// Selected shipping method, or `default` before the delivery step.
    #[must_use]
    pub fn shipping_method(&self, default: ShippingMethod) -> ShippingMethod {
        self.delivery.as_ref().map_or(default, |d| d.method)
    }

    /// Whether every step before `step` holds valid data.
    #[must_use]
    pub const fn can_enter(&self, step: CheckoutStep) -> bool {
        match step {
            CheckoutStep::Customer => true,
            CheckoutStep::Delivery => self.customer.is_some(),
            CheckoutStep::Payment => self.customer.is_some() && self.delivery.is_some(),
        }
    }

    /// The furthest step the customer may currently open.
    #[must_use]
    pub fn furthest_step(&self) -> CheckoutStep {
        CheckoutStep::ALL
            .iter()
            .rev()
            .copied()
            .find(|s| self.can_enter(*s))
            .unwrap_or_default()
    }

    /// Move to `step` if it is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::StepLocked`] naming the first incomplete step.
    pub fn enter(&mut self, step: CheckoutStep) -> Result<(), CheckoutError> {
        if !self.can_enter(step) {
            return Err(CheckoutError::StepLocked(self.furthest_step()));
        }
        self.step = step;
        Ok(())
    }

    /// Complete the customer step and advance to delivery.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Invalid`] if validation fails; the draft is
    /// left unchanged.
    pub fn submit_customer(&mut self, input: &CustomerInput) -> Result<(), CheckoutError> {
        let details = input.validate()?;
        if self.customer.as_ref() != Some(&details) {
            self.clear_order();
        }
        self.customer = Some(details);
        self.step = CheckoutStep::Delivery;
        Ok(())
    }

    /// Complete the delivery step and advance to payment.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::StepLocked`] if the customer step is
    /// incomplete, or [`CheckoutError::Invalid`] if validation fails.
    pub fn submit_delivery(
        &mut self,
        input: &DeliveryInput,
        default_method: ShippingMethod,
    ) -> Result<(), CheckoutError> {
        if !self.can_enter(CheckoutStep::Delivery) {
            return Err(CheckoutError::StepLocked(CheckoutStep::Customer));
        }
        let details = input.validate(default_method)?;
        if self.delivery.as_ref() != Some(&details) {
            self.clear_order();
        }
        self.delivery = Some(details);
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Go back one step. Returns the step now current.
    pub fn back(&mut self) -> CheckoutStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Remember the order created for this draft.
    pub fn record_order(&mut self, order_id: OrderId) {
        self.order_id = Some(order_id);
    }

    /// Remember the gateway reference for the pending payment.
    pub fn record_payment_reference(&mut self, reference: PaymentReference) {
        self.payment_reference = Some(reference);
    }

    /// Forget the order so the next payment attempt creates a fresh one.
    pub fn clear_order(&mut self) {
        self.order_id = None;
        self.payment_reference = None;
    }

    /// Discard everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn field_error(field: &'static str, message: impl Into<String>) -> FieldError {
    FieldError {
        field,
        message: message.into(),
    }
}

fn required_text(
    value: &str,
    field: &'static str,
    label: &str,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field_error(field, format!("{label} is required")));
    } else if value.chars().count() > max {
        errors.push(field_error(field, format!("{label} must be at most {max} characters")));
    }
    value.to_string()
}

fn optional_text(
    value: &str,
    field: &'static str,
    label: &str,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.chars().count() > max {
        errors.push(field_error(field, format!("{label} must be at most {max} characters")));
    }
    Some(value.to_string())
}

/// Strip formatting from a phone number, keeping a leading `+`.
fn normalize_phone(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Phone number is required".to_string());
    }

    let plus = raw.starts_with('+');
    let mut digits = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            '+' if digits.is_empty() => {}
            _ => return Err("Phone number may only contain digits".to_string()),
        }
    }

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(format!(
            "Phone number must have {MIN_PHONE_DIGITS} to {MAX_PHONE_DIGITS} digits"
        ));
    }

    Ok(if plus { format!("+{digits}") } else { digits })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer_input() -> CustomerInput {
        CustomerInput {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            phone: "+234 803 123 4567".to_string(),
        }
    }

    fn delivery_input() -> DeliveryInput {
        DeliveryInput {
            method: "delivery".to_string(),
            address: "12 Admiralty Way".to_string(),
            city: "Lekki".to_string(),
            state: "Lagos".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_linear_progression() {
        let mut draft = CheckoutDraft::default();
        assert_eq!(draft.step(), CheckoutStep::Customer);

        draft.submit_customer(&customer_input()).unwrap();
        assert_eq!(draft.step(), CheckoutStep::Delivery);
        assert_eq!(draft.customer().unwrap().phone, "+2348031234567");

        draft
            .submit_delivery(&delivery_input(), ShippingMethod::Delivery)
            .unwrap();
        assert_eq!(draft.step(), CheckoutStep::Payment);
        assert!(draft.can_enter(CheckoutStep::Payment));
    }

    #[test]
    fn test_payment_locked_until_earlier_steps_complete() {
        let mut draft = CheckoutDraft::default();
        assert_eq!(
            draft.enter(CheckoutStep::Payment),
            Err(CheckoutError::StepLocked(CheckoutStep::Customer))
        );

        draft.submit_customer(&customer_input()).unwrap();
        assert_eq!(
            draft.enter(CheckoutStep::Payment),
            Err(CheckoutError::StepLocked(CheckoutStep::Delivery))
        );
        assert!(draft.enter(CheckoutStep::Delivery).is_ok());
    }

    #[test]
    fn test_delivery_requires_customer() {
        let mut draft = CheckoutDraft::default();
        assert_eq!(
            draft.submit_delivery(&delivery_input(), ShippingMethod::Delivery),
            Err(CheckoutError::StepLocked(CheckoutStep::Customer))
        );
    }

    #[test]
    fn test_back_moves_one_step_and_stops_at_customer() {
        let mut draft = CheckoutDraft::default();
        draft.submit_customer(&customer_input()).unwrap();
        draft
            .submit_delivery(&delivery_input(), ShippingMethod::Delivery)
            .unwrap();

        assert_eq!(draft.back(), CheckoutStep::Delivery);
        assert_eq!(draft.back(), CheckoutStep::Customer);
        assert_eq!(draft.back(), CheckoutStep::Customer);
        // Going back keeps the data already entered.
        assert!(draft.can_enter(CheckoutStep::Payment));
    }

    #[test]
    fn test_invalid_customer_collects_all_errors() {
        let mut draft = CheckoutDraft::default();
        let input = CustomerInput {
            email: "nope".to_string(),
            first_name: " ".to_string(),
            last_name: "Obi".to_string(),
            phone: "12".to_string(),
        };
        let err = draft.submit_customer(&input).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "first_name", "phone"]);
        assert_eq!(draft.step(), CheckoutStep::Customer);
        assert!(draft.customer().is_none());
    }

    #[test]
    fn test_pickup_needs_no_address() {
        let input = DeliveryInput {
            method: "pickup".to_string(),
            ..DeliveryInput::default()
        };
        let details = input.validate(ShippingMethod::Delivery).unwrap();
        assert_eq!(details.method, ShippingMethod::Pickup);
        assert!(details.address.is_none());
    }

    #[test]
    fn test_unknown_method_uses_default() {
        let input = DeliveryInput {
            method: "teleport".to_string(),
            ..DeliveryInput::default()
        };
        let details = input.validate(ShippingMethod::Pickup).unwrap();
        assert_eq!(details.method, ShippingMethod::Pickup);

        let err = input.validate(ShippingMethod::Delivery).unwrap_err();
        assert_eq!(err.field_errors().len(), 3);
    }

    #[test]
    fn test_changing_details_discards_order() {
        let mut draft = CheckoutDraft::default();
        draft.submit_customer(&customer_input()).unwrap();
        draft
            .submit_delivery(&delivery_input(), ShippingMethod::Delivery)
            .unwrap();
        draft.record_order(OrderId::new("ord_1"));

        // Same details again keep the order.
        draft
            .submit_delivery(&delivery_input(), ShippingMethod::Delivery)
            .unwrap();
        assert!(draft.order_id().is_some());

        let pickup = DeliveryInput {
            method: "pickup".to_string(),
            ..DeliveryInput::default()
        };
        draft.submit_delivery(&pickup, ShippingMethod::Delivery).unwrap();
        assert!(draft.order_id().is_none());
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("0803-123-4567").unwrap(), "08031234567");
        assert_eq!(normalize_phone(" +234 (803) 123.4567 ").unwrap(), "+2348031234567");
        assert_eq!(
            normalize_phone("0803 123 4567 ext 2").unwrap_err(),
            "Phone number may only contain digits"
        );
        assert!(normalize_phone("123").is_err());
    }
}
