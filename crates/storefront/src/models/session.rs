//! Session-related types.
//!
//! The cart and the checkout draft live in the session as JSON. Reads that
//! fail to deserialize (for example after a deploy changed the shape) are
//! treated as empty rather than as errors.

use perfumery_core::{Cart, CheckoutDraft};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_sessions::Session;

/// Session keys for storefront data.
pub mod keys {
    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for the in-progress checkout draft.
    pub const CHECKOUT: &str = "checkout";
}

async fn load_or_default<T>(session: &Session, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match session.get::<T>(key).await {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, "Discarding unreadable session value: {e}");
            T::default()
        }
    }
}

async fn store<T: Serialize + Send + Sync>(
    session: &Session,
    key: &str,
    value: &T,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(key, value).await
}

/// The session's cart, empty if none.
pub async fn load_cart(session: &Session) -> Cart {
    load_or_default(session, keys::CART).await
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(
    session: &Session,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    store(session, keys::CART, cart).await
}

/// The session's checkout draft, fresh if none.
pub async fn load_draft(session: &Session) -> CheckoutDraft {
    load_or_default(session, keys::CHECKOUT).await
}

/// Persist the checkout draft.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_draft(
    session: &Session,
    draft: &CheckoutDraft,
) -> Result<(), tower_sessions::session::Error> {
    store(session, keys::CHECKOUT, draft).await
}

/// Drop any order already created for the draft.
///
/// Called whenever the cart changes so payment never charges a stale total.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn invalidate_order(session: &Session) -> Result<(), tower_sessions::session::Error> {
    let mut draft = load_draft(session).await;
    if draft.order_id().is_some() {
        draft.clear_order();
        save_draft(session, &draft).await?;
    }
    Ok(())
}

/// Forget the cart and the checkout draft after a successful payment.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_purchase(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(keys::CART).await?;
    session.remove_value(keys::CHECKOUT).await?;
    Ok(())
}
