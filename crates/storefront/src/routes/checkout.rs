//! Checkout wizard route handlers.
//!
//! Three steps in fixed order: customer details, delivery or pickup, then
//! payment. The draft lives in the session; a step can only be opened once
//! every earlier step holds valid data, otherwise the customer is redirected
//! to the furthest step they may open.
//!
//! Paying creates the order (once per draft), asks the API to initialize a
//! Paystack transaction and redirects to the hosted payment page. Paystack
//! sends the customer back to `/checkout/callback`, where the payment is
//! verified and the result shown. API failures are displayed inline on the
//! current step with the API's own message; nothing is retried.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use perfumery_core::checkout::{CustomerInput, DeliveryInput, FieldError};
use perfumery_core::{
    Cart, CheckoutDraft, CheckoutError, CheckoutStep, CustomerDetails, DeliveryDetails, OrderId,
    PaymentReference, PaymentStatus, Price, ShippingSelector,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use super::Page;
use super::cart::CartView;
use crate::analytics::{AnalyticsItem, EcommerceEvent};
use crate::api::{ApiError, CreateOrderRequest, PaymentVerification};
use crate::config::StorefrontConfig;
use crate::error::{AppError, Result, add_breadcrumb, api_error_status};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session::{clear_purchase, load_cart, load_draft, save_draft};
use crate::seo::SeoMeta;
use crate::state::AppState;

// =============================================================================
// View models
// =============================================================================

/// One entry of the step indicator.
#[derive(Debug, Clone)]
pub struct StepView {
    pub number: usize,
    pub title: &'static str,
    pub slug: &'static str,
    pub current: bool,
    pub complete: bool,
    /// Whether the indicator links to the step
    pub reachable: bool,
}

/// Step indicator and navigation state.
#[derive(Debug, Clone)]
pub struct WizardView {
    pub steps: Vec<StepView>,
    pub can_go_back: bool,
}

impl WizardView {
    fn new(draft: &CheckoutDraft) -> Self {
        let current = draft.step();
        Self {
            steps: CheckoutStep::ALL
                .iter()
                .map(|&step| StepView {
                    number: step.index(),
                    title: step.title(),
                    slug: step.slug(),
                    current: step == current,
                    complete: step.index() < current.index() && draft.can_enter(step),
                    reachable: draft.can_enter(step),
                })
                .collect(),
            can_go_back: current.previous().is_some(),
        }
    }
}

/// Validation messages keyed by form field.
#[derive(Debug, Clone, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn from_error(err: &CheckoutError) -> Self {
        Self(err.field_errors().to_vec())
    }

    /// Message for a field, if it failed validation.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A shipping option on the delivery step.
#[derive(Debug, Clone)]
pub struct ShippingOption {
    pub value: &'static str,
    pub label: &'static str,
    pub fee: String,
    pub selected: bool,
}

/// Verified payment as shown on the result page.
#[derive(Debug, Clone)]
pub struct PaymentResultView {
    pub reference: String,
    pub amount: String,
    pub currency: String,
    pub status: PaymentStatus,
    pub paid_at: Option<String>,
}

impl PaymentResultView {
    fn new(verification: &PaymentVerification, config: &StorefrontConfig) -> Self {
        let price = verification.price(config.store.currency);
        let amount = if price.currency_code == config.store.currency {
            price.display_with(&config.store.currency_symbol)
        } else {
            price.display()
        };
        Self {
            reference: verification.reference.to_string(),
            amount,
            currency: verification.currency.clone(),
            status: verification.status,
            paid_at: verification
                .paid_at
                .map(|t| t.format("%-d %B %Y, %H:%M UTC").to_string()),
        }
    }

    #[must_use]
    pub const fn successful(&self) -> bool {
        self.status.is_successful()
    }

    #[must_use]
    pub const fn pending(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending)
    }

    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Step 1: contact details.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/customer.html")]
pub struct CustomerTemplate {
    pub page: Page,
    pub wizard: WizardView,
    pub input: CustomerInput,
    pub errors: FieldErrors,
    pub cart: CartView,
}

/// Step 2: delivery or pickup.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/delivery.html")]
pub struct DeliveryTemplate {
    pub page: Page,
    pub wizard: WizardView,
    pub input: DeliveryInput,
    pub options: Vec<ShippingOption>,
    pub address_required: bool,
    pub pickup_location: Option<String>,
    pub errors: FieldErrors,
    pub cart: CartView,
}

/// Step 3: review and pay.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: Page,
    pub wizard: WizardView,
    pub customer: CustomerDetails,
    pub delivery: DeliveryDetails,
    pub pickup_location: Option<String>,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Payment result after returning from Paystack.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/result.html")]
pub struct ResultTemplate {
    pub page: Page,
    pub result: Option<PaymentResultView>,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn step_path(step: CheckoutStep) -> String {
    format!("/checkout/{}", step.slug())
}

fn redirect_to_step(step: CheckoutStep) -> Response {
    Redirect::to(&step_path(step)).into_response()
}

/// Outcome of trying to open a step.
enum Entry {
    Open { cart: Cart, draft: CheckoutDraft },
    Redirect(Response),
}

/// Load the cart and draft and move the draft to `step`.
///
/// An empty cart sends the customer back to the cart page; a locked step
/// sends them to the furthest step they may open.
async fn enter(session: &Session, step: CheckoutStep) -> Result<Entry> {
    let cart = load_cart(session).await;
    if cart.is_empty() {
        return Ok(Entry::Redirect(Redirect::to("/cart").into_response()));
    }

    let mut draft = load_draft(session).await;
    match draft.enter(step) {
        Ok(()) => {
            save_draft(session, &draft).await?;
            Ok(Entry::Open { cart, draft })
        }
        Err(CheckoutError::StepLocked(furthest)) => {
            tracing::debug!(?step, ?furthest, "Checkout step locked");
            Ok(Entry::Redirect(redirect_to_step(furthest)))
        }
        Err(e @ CheckoutError::Invalid(_)) => Err(AppError::Internal(e.to_string())),
    }
}

fn cart_view(state: &AppState, cart: &Cart, draft: &CheckoutDraft) -> CartView {
    CartView::new(
        cart,
        state,
        draft.shipping_method(state.config().store.default_shipping),
    )
}

fn checkout_page(
    state: &AppState,
    title: &str,
    step: CheckoutStep,
    nonce: String,
    cart: &Cart,
) -> Page {
    let seo = SeoMeta::private(state.config(), title, &step_path(step));
    Page::new(state, seo, nonce, cart)
}

fn delivery_fee_display(state: &AppState) -> String {
    let store = &state.config().store;
    if store.delivery_fee.is_zero() {
        "Free".to_string()
    } else {
        Price::new(store.delivery_fee, store.currency).display_with(&store.currency_symbol)
    }
}

fn shipping_options(state: &AppState, selector: &ShippingSelector) -> Vec<ShippingOption> {
    let delivery_fee = delivery_fee_display(state);
    selector
        .options()
        .into_iter()
        .map(|(method, selected)| ShippingOption {
            value: method.as_str(),
            label: method.label(),
            fee: if method.requires_address() {
                delivery_fee.clone()
            } else {
                "Free".to_string()
            },
            selected,
        })
        .collect()
}

/// `{base}/checkout/callback?orderId=...`
fn callback_url(config: &StorefrontConfig, order_id: &OrderId) -> Result<String> {
    let mut url = Url::parse(&config.absolute_url("/checkout/callback"))
        .map_err(|e| AppError::Internal(format!("invalid callback URL: {e}")))?;
    url.query_pairs_mut().append_pair("orderId", order_id.as_str());
    Ok(url.into())
}

/// Accept only http(s) authorization URLs from the API.
fn authorization_redirect(authorization_url: &str) -> Option<String> {
    Url::parse(authorization_url)
        .ok()
        .filter(|u| matches!(u.scheme(), "https" | "http"))
        .map(String::from)
}

// =============================================================================
// Handlers
// =============================================================================

/// Redirect to the step the customer is on.
#[instrument(skip(session))]
pub async fn index(session: Session) -> Response {
    if load_cart(&session).await.is_empty() {
        return Redirect::to("/cart").into_response();
    }
    let draft = load_draft(&session).await;
    let step = if draft.can_enter(draft.step()) {
        draft.step()
    } else {
        draft.furthest_step()
    };
    redirect_to_step(step)
}

/// Step 1 form.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce))]
pub async fn customer(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let (cart, draft) = match enter(&session, CheckoutStep::Customer).await? {
        Entry::Open { cart, draft } => (cart, draft),
        Entry::Redirect(response) => return Ok(response),
    };

    let cart_view = cart_view(&state, &cart, &draft);
    let mut page = checkout_page(
        &state,
        "Checkout: your details",
        CheckoutStep::Customer,
        nonce,
        &cart,
    );
    page.analytics
        .push(&EcommerceEvent::begin_checkout(&cart.lines, &cart_view.summary));

    Ok(CustomerTemplate {
        page,
        wizard: WizardView::new(&draft),
        input: draft
            .customer()
            .map(CustomerDetails::to_input)
            .unwrap_or_default(),
        errors: FieldErrors::default(),
        cart: cart_view,
    }
    .into_response())
}

/// Submit step 1.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce, input))]
pub async fn submit_customer(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(input): Form<CustomerInput>,
) -> Result<Response> {
    let (cart, mut draft) = match enter(&session, CheckoutStep::Customer).await? {
        Entry::Open { cart, draft } => (cart, draft),
        Entry::Redirect(response) => return Ok(response),
    };

    match draft.submit_customer(&input) {
        Ok(()) => {
            save_draft(&session, &draft).await?;
            add_breadcrumb("checkout", "Customer details saved", None);
            Ok(redirect_to_step(CheckoutStep::Delivery))
        }
        Err(err) => {
            let page = checkout_page(
                &state,
                "Checkout: your details",
                CheckoutStep::Customer,
                nonce,
                &cart,
            );
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                CustomerTemplate {
                    page,
                    wizard: WizardView::new(&draft),
                    errors: FieldErrors::from_error(&err),
                    input,
                    cart: cart_view(&state, &cart, &draft),
                },
            )
                .into_response())
        }
    }
}

fn delivery_template(
    state: &AppState,
    page: Page,
    cart: &Cart,
    draft: &CheckoutDraft,
    input: DeliveryInput,
    errors: FieldErrors,
) -> DeliveryTemplate {
    let store = &state.config().store;
    let mut selector = ShippingSelector::new(draft.shipping_method(store.default_shipping));
    let method = selector.select_str(&input.method);

    DeliveryTemplate {
        page,
        wizard: WizardView::new(draft),
        options: shipping_options(state, &selector),
        address_required: method.requires_address(),
        pickup_location: store.pickup_location.clone(),
        input,
        errors,
        cart: CartView::new(cart, state, method),
    }
}

/// Step 2 form.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce))]
pub async fn delivery(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let (cart, draft) = match enter(&session, CheckoutStep::Delivery).await? {
        Entry::Open { cart, draft } => (cart, draft),
        Entry::Redirect(response) => return Ok(response),
    };

    let input = draft
        .delivery()
        .map(DeliveryDetails::to_input)
        .unwrap_or_default();
    let page = checkout_page(
        &state,
        "Checkout: delivery",
        CheckoutStep::Delivery,
        nonce,
        &cart,
    );
    Ok(
        delivery_template(&state, page, &cart, &draft, input, FieldErrors::default())
            .into_response(),
    )
}

/// Submit step 2.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce, input))]
pub async fn submit_delivery(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(input): Form<DeliveryInput>,
) -> Result<Response> {
    let (cart, mut draft) = match enter(&session, CheckoutStep::Delivery).await? {
        Entry::Open { cart, draft } => (cart, draft),
        Entry::Redirect(response) => return Ok(response),
    };

    match draft.submit_delivery(&input, state.config().store.default_shipping) {
        Ok(()) => {
            save_draft(&session, &draft).await?;
            add_breadcrumb("checkout", "Delivery details saved", None);
            Ok(redirect_to_step(CheckoutStep::Payment))
        }
        Err(CheckoutError::StepLocked(step)) => Ok(redirect_to_step(step)),
        Err(err) => {
            let page = checkout_page(
                &state,
                "Checkout: delivery",
                CheckoutStep::Delivery,
                nonce,
                &cart,
            );
            let errors = FieldErrors::from_error(&err);
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                delivery_template(&state, page, &cart, &draft, input, errors),
            )
                .into_response())
        }
    }
}

fn payment_template(
    state: &AppState,
    nonce: String,
    cart: &Cart,
    draft: &CheckoutDraft,
    error: Option<String>,
) -> Option<PaymentTemplate> {
    let customer = draft.customer()?.clone();
    let delivery = draft.delivery()?.clone();
    let cart_view = cart_view(state, cart, draft);

    let mut page = checkout_page(state, "Checkout: payment", CheckoutStep::Payment, nonce, cart);
    if error.is_none() {
        page.analytics.push(&EcommerceEvent::AddShippingInfo {
            items: EcommerceEvent::items_of(&cart.lines),
            value: cart_view.summary.subtotal.amount,
            method: delivery.method,
        });
    }

    Some(PaymentTemplate {
        page,
        wizard: WizardView::new(draft),
        customer,
        delivery,
        pickup_location: state.config().store.pickup_location.clone(),
        cart: cart_view,
        error,
    })
}

/// Step 3: order summary and pay button.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let (cart, draft) = match enter(&session, CheckoutStep::Payment).await? {
        Entry::Open { cart, draft } => (cart, draft),
        Entry::Redirect(response) => return Ok(response),
    };

    Ok(payment_template(&state, nonce, &cart, &draft, None).map_or_else(
        || redirect_to_step(draft.furthest_step()),
        IntoResponse::into_response,
    ))
}

/// Show an API failure inline on the payment step.
fn payment_failed(
    state: &AppState,
    nonce: String,
    cart: &Cart,
    draft: &CheckoutDraft,
    err: &ApiError,
) -> Response {
    tracing::warn!(error = %err, "Checkout payment step failed");
    let status = api_error_status(err);
    if status.is_server_error() {
        sentry::capture_error(err);
    }
    payment_template(state, nonce, cart, draft, Some(err.user_message())).map_or_else(
        || redirect_to_step(draft.furthest_step()),
        |template| (status, template).into_response(),
    )
}

/// Create the order (once per draft), initialize payment and redirect to
/// the Paystack hosted page.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let (cart, mut draft) = match enter(&session, CheckoutStep::Payment).await? {
        Entry::Open { cart, draft } => (cart, draft),
        Entry::Redirect(response) => return Ok(response),
    };
    let (Some(customer), Some(delivery)) = (draft.customer().cloned(), draft.delivery().cloned())
    else {
        return Ok(redirect_to_step(draft.furthest_step()));
    };

    let order_id = if let Some(order_id) = draft.order_id() {
        order_id.clone()
    } else {
        let request = CreateOrderRequest::from_checkout(&customer, &delivery, &cart);
        match state.api().create_order(&request).await {
            Ok(order) => {
                tracing::info!(order_id = %order.id, "Order created");
                add_breadcrumb(
                    "checkout",
                    "Order created",
                    Some(&[("order_id", order.id.as_str())]),
                );
                draft.record_order(order.id.clone());
                save_draft(&session, &draft).await?;
                order.id
            }
            Err(err) => return Ok(payment_failed(&state, nonce, &cart, &draft, &err)),
        }
    };

    let callback = callback_url(state.config(), &order_id)?;
    let init = match state
        .api()
        .initialize_payment(&order_id, customer.email.as_str(), &callback)
        .await
    {
        Ok(init) => init,
        Err(err) => return Ok(payment_failed(&state, nonce, &cart, &draft, &err)),
    };

    let Some(target) = authorization_redirect(&init.authorization_url) else {
        tracing::error!(url = %init.authorization_url, "Unusable authorization URL from API");
        let err = ApiError::Api {
            status: 502,
            code: None,
            message: "Payment could not be started. Please try again.".to_string(),
            details: None,
        };
        return Ok(payment_failed(&state, nonce, &cart, &draft, &err));
    };

    draft.record_payment_reference(init.reference.clone());
    save_draft(&session, &draft).await?;
    add_breadcrumb(
        "checkout",
        "Payment initialized",
        Some(&[("order_id", order_id.as_str()), ("reference", init.reference.as_str())]),
    );

    Ok(Redirect::to(&target).into_response())
}

/// Go back one step.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(session))]
pub async fn back(session: Session) -> Result<Response> {
    let mut draft = load_draft(&session).await;
    let step = draft.back();
    save_draft(&session, &draft).await?;
    Ok(redirect_to_step(step))
}

/// Query string Paystack appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Paystack return: verify the payment and show the result.
///
/// A successful payment for this session's order clears the cart and the
/// draft. Anything else leaves them so the customer can try again.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, nonce))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let config = state.config();
    let seo = SeoMeta::private(config, "Payment", "/checkout/callback");
    let draft = load_draft(&session).await;
    let cart = load_cart(&session).await;

    let order_id = draft
        .order_id()
        .cloned()
        .or_else(|| non_empty(query.order_id).map(OrderId::new));
    let reference = non_empty(query.reference)
        .or_else(|| non_empty(query.trxref))
        .map(PaymentReference::new)
        .or_else(|| draft.payment_reference().cloned());

    let (Some(order_id), Some(reference)) = (order_id, reference) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            ResultTemplate {
                page: Page::new(&state, seo, nonce, &cart),
                result: None,
                error: Some("We could not find a payment to verify.".to_string()),
            },
        )
            .into_response());
    };

    let verification = match state.api().verify_payment(&order_id, &reference).await {
        Ok(verification) => verification,
        Err(err) => {
            tracing::warn!(error = %err, order_id = %order_id, "Payment verification failed");
            return Ok((
                api_error_status(&err),
                ResultTemplate {
                    page: Page::new(&state, seo, nonce, &cart),
                    result: None,
                    error: Some(err.user_message()),
                },
            )
                .into_response());
        }
    };

    let result = PaymentResultView::new(&verification, config);
    tracing::info!(
        order_id = %order_id,
        reference = %verification.reference,
        status = verification.status.as_str(),
        "Payment verified"
    );

    if result.successful() && draft.order_id() == Some(&order_id) {
        let summary = cart_view(&state, &cart, &draft).summary;
        let items: Vec<AnalyticsItem> = EcommerceEvent::items_of(&cart.lines);

        clear_purchase(&session).await?;
        add_breadcrumb("checkout", "Payment successful", Some(&[("order_id", order_id.as_str())]));

        let mut page = Page::new(&state, seo, nonce, &Cart::default());
        page.analytics.push(&EcommerceEvent::AddPaymentInfo {
            items: items.clone(),
            value: summary.subtotal.amount,
        });
        page.analytics.push(&EcommerceEvent::purchase(
            &verification,
            config.store.currency,
            summary.shipping_fee.amount,
            items,
        ));
        return Ok(ResultTemplate {
            page,
            result: Some(result),
            error: None,
        }
        .into_response());
    }

    Ok(ResultTemplate {
        page: Page::new(&state, seo, nonce, &cart),
        result: Some(result),
        error: None,
    }
    .into_response())
}
