//! User-facing messages from heterogeneous API error bodies.
//!
//! The commerce API, its proxies and the payment gateway do not agree on an
//! error shape. The message is taken from the first of these that holds a
//! non-empty string:
//!
//! 1. `body.message`
//! 2. `body.error.message`
//! 3. `body.error` (when it is itself a string)
//! 4. `body.data.message`
//!
//! and otherwise falls back to `Request failed with status <code>`.

use serde_json::Value;

/// Extract the message to show the customer for a failed API response.
#[must_use]
pub fn extract_error_message(status: u16, body: &Value) -> String {
    let candidates = [
        body.get("message"),
        body.get("error").and_then(|e| e.get("message")),
        body.get("error"),
        body.get("data").and_then(|d| d.get("message")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|m| !m.is_empty())
        .map_or_else(|| fallback_message(status), str::to_string)
}

/// Extract the message from a raw response body that may not be JSON.
#[must_use]
pub fn extract_error_message_from_text(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body).map_or_else(
        |_| fallback_message(status),
        |value| extract_error_message(status, &value),
    )
}

fn fallback_message(status: u16) -> String {
    format!("Request failed with status {status}")
}
