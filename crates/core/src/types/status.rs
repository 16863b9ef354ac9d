//! Status enums reported by the commerce API and the payment gateway.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Payment status as mirrored from the Paystack verify response.
///
/// Paystack may add statuses over time; anything unrecognised becomes
/// [`PaymentStatus::Unknown`] instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaymentStatus {
    Success,
    Failed,
    Abandoned,
    #[default]
    Pending,
    Reversed,
    Unknown,
}

impl PaymentStatus {
    /// Parse a status string (case-insensitive).
    #[must_use]
    pub fn from_status(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" | "successful" | "paid" => Self::Success,
            "failed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            "pending" | "ongoing" | "processing" => Self::Pending,
            "reversed" => Self::Reversed,
            _ => Self::Unknown,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Pending => "pending",
            Self::Reversed => "reversed",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable label for the result page.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "Payment successful",
            Self::Failed => "Payment failed",
            Self::Abandoned => "Payment was not completed",
            Self::Pending => "Payment pending",
            Self::Reversed => "Payment reversed",
            Self::Unknown => "Payment status unknown",
        }
    }

    /// Whether the order is paid.
    #[must_use]
    pub const fn is_successful(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_status(&value))
    }
}

/// Error codes from the commerce API error envelope.
///
/// `{ "success": false, "error": { "message": "...", "code": "NOT_FOUND" } }`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    ValidationError,
    InvalidProduct,
    InsufficientStock,
    InvalidPrice,
    Unauthorized,
    InvalidCredentials,
    Forbidden,
    NotFound,
    TenantNotFound,
    DuplicateEmail,
    RateLimitExceeded,
    InternalError,
    PaymentGatewayError,
    /// A code outside the documented set, kept verbatim.
    Unknown(String),
}

impl ApiErrorCode {
    /// Parse a wire code. Never fails.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "VALIDATION_ERROR" => Self::ValidationError,
            "INVALID_PRODUCT" => Self::InvalidProduct,
            "INSUFFICIENT_STOCK" => Self::InsufficientStock,
            "INVALID_PRICE" => Self::InvalidPrice,
            "UNAUTHORIZED" => Self::Unauthorized,
            "INVALID_CREDENTIALS" => Self::InvalidCredentials,
            "FORBIDDEN" => Self::Forbidden,
            "NOT_FOUND" => Self::NotFound,
            "TENANT_NOT_FOUND" => Self::TenantNotFound,
            "DUPLICATE_EMAIL" => Self::DuplicateEmail,
            "RATE_LIMIT_EXCEEDED" => Self::RateLimitExceeded,
            "INTERNAL_ERROR" => Self::InternalError,
            "PAYMENT_GATEWAY_ERROR" => Self::PaymentGatewayError,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidProduct => "INVALID_PRODUCT",
            Self::InsufficientStock => "INSUFFICIENT_STOCK",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::TenantNotFound => "TENANT_NOT_FOUND",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::PaymentGatewayError => "PAYMENT_GATEWAY_ERROR",
            Self::Unknown(code) => code,
        }
    }

    /// Whether the customer can fix the problem by changing their input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError
                | Self::InvalidProduct
                | Self::InsufficientStock
                | Self::InvalidPrice
                | Self::DuplicateEmail
        )
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApiErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}
