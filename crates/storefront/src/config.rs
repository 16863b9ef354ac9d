//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (used for canonical
//!   links and the Paystack callback URL)
//! - `STOREFRONT_SESSION_SECRET` - Cookie signing secret (min 32 chars, high entropy)
//! - `COMMERCE_API_URL` - Base URL of the e-commerce REST API
//! - `STOREFRONT_TENANT_DOMAIN` - Domain sent as `X-Frontend-Domain` to select the tenant
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_SITE_NAME` - Shop name for titles and Open Graph (default: Perfumery)
//! - `STOREFRONT_SITE_DESCRIPTION` - Default meta description
//! - `STOREFRONT_CURRENCY` - ISO 4217 code (default: NGN)
//! - `STOREFRONT_CURRENCY_SYMBOL` - Overrides the currency's own symbol
//! - `STOREFRONT_DELIVERY_FEE` - Flat delivery fee in major units (default: 0)
//! - `STOREFRONT_DEFAULT_SHIPPING` - `delivery` or `pickup` (default: delivery)
//! - `STOREFRONT_PICKUP_LOCATION` - Address shown for store pickup
//! - `STOREFRONT_PRODUCTS_PER_PAGE` - Catalogue page size (default: 12)
//! - `COMMERCE_API_TIMEOUT_SECS` - Request timeout (default: 15)
//! - `GA4_MEASUREMENT_ID` - Google Analytics 4 measurement ID
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use perfumery_core::{CurrencyCode, ShippingMethod};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MAX_PRODUCTS_PER_PAGE: u32 = 100;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Cookie signing secret
    pub session_secret: SecretString,
    /// Commerce REST API configuration
    pub api: CommerceApiConfig,
    /// Shop presentation and pricing
    pub store: StoreConfig,
    /// Analytics tracking configuration
    pub analytics: AnalyticsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Commerce REST API configuration.
#[derive(Debug, Clone)]
pub struct CommerceApiConfig {
    /// API base URL (e.g. `https://api.example.com`)
    pub base_url: Url,
    /// Storefront domain sent in `X-Frontend-Domain`
    pub tenant_domain: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Catalogue cache time-to-live
    pub cache_ttl: Duration,
}

/// Shop presentation, pricing and shipping settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub site_name: String,
    pub site_description: String,
    pub currency: CurrencyCode,
    pub currency_symbol: String,
    /// Flat delivery fee; pickup is free
    pub delivery_fee: Decimal,
    /// Initial selection of the shipping-method selector
    pub default_shipping: ShippingMethod,
    pub pickup_location: Option<String>,
    pub products_per_page: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let currency = CurrencyCode::default();
        Self {
            site_name: "Perfumery".to_string(),
            site_description: "Designer and niche fragrances, delivered.".to_string(),
            currency,
            currency_symbol: currency.symbol().to_string(),
            delivery_fee: Decimal::ZERO,
            default_shipping: ShippingMethod::default(),
            pickup_location: None,
            products_per_page: 12,
        }
    }
}

/// Analytics tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    /// Google Analytics 4 measurement ID
    pub ga4_measurement_id: Option<String>,
}

impl AnalyticsConfig {
    /// Whether any tracking is configured.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.ga4_measurement_id.is_some()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            api: CommerceApiConfig::from_env()?,
            store: StoreConfig::from_env()?,
            analytics: AnalyticsConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Configuration for local development and in-process tests.
    ///
    /// Binds to localhost, uses default store settings and disables Sentry
    /// and analytics.
    #[must_use]
    pub fn local(api_base_url: Url) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("kV9#qL2@wX7!mR4$tZ8&nB3*pD6^hF1%"),
            api: CommerceApiConfig {
                base_url: api_base_url,
                tenant_domain: "localhost".to_string(),
                timeout: Duration::from_secs(5),
                cache_ttl: Duration::from_secs(300),
            },
            store: StoreConfig::default(),
            analytics: AnalyticsConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CommerceApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("COMMERCE_API_URL")?;
        let base_url = Url::parse(raw.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidEnvVar("COMMERCE_API_URL".to_string(), e.to_string())
        })?;
        let timeout_secs = parse_env_or_default::<u64>("COMMERCE_API_TIMEOUT_SECS", "15")?;

        Ok(Self {
            base_url,
            tenant_domain: get_required_env("STOREFRONT_TENANT_DOMAIN")?,
            timeout: Duration::from_secs(timeout_secs),
            cache_ttl: Duration::from_secs(300),
        })
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let currency = get_optional_env("STOREFRONT_CURRENCY")
            .map(|code| {
                code.parse::<CurrencyCode>().map_err(|e| {
                    ConfigError::InvalidEnvVar("STOREFRONT_CURRENCY".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(defaults.currency);

        let products_per_page = parse_env_or_default::<u32>("STOREFRONT_PRODUCTS_PER_PAGE", "12")?;
        if products_per_page == 0 || products_per_page > MAX_PRODUCTS_PER_PAGE {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_PRODUCTS_PER_PAGE".to_string(),
                format!("must be between 1 and {MAX_PRODUCTS_PER_PAGE}"),
            ));
        }

        let delivery_fee = parse_env_or_default::<Decimal>("STOREFRONT_DELIVERY_FEE", "0")?;
        if delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_DELIVERY_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            site_name: get_env_or_default("STOREFRONT_SITE_NAME", &defaults.site_name),
            site_description: get_env_or_default(
                "STOREFRONT_SITE_DESCRIPTION",
                &defaults.site_description,
            ),
            currency,
            currency_symbol: get_optional_env("STOREFRONT_CURRENCY_SYMBOL")
                .unwrap_or_else(|| currency.symbol().to_string()),
            delivery_fee,
            default_shipping: parse_env_or_default("STOREFRONT_DEFAULT_SHIPPING", "delivery")?,
            pickup_location: get_optional_env("STOREFRONT_PICKUP_LOCATION"),
            products_per_page,
        })
    }
}

impl AnalyticsConfig {
    fn from_env() -> Self {
        Self {
            ga4_measurement_id: get_optional_env("GA4_MEASUREMENT_ID"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("changeme-session-key", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_local_config_secret_passes_validation() {
        let config = StorefrontConfig::local(Url::parse("http://127.0.0.1:9").unwrap());
        let secret = config.session_secret.expose_secret();
        assert!(validate_secret_strength(secret, "S").is_ok());
        assert!(validate_session_secret(&config.session_secret, "S").is_ok());
    }

    #[test]
    fn test_socket_addr_and_urls() {
        let config = StorefrontConfig::local(Url::parse("http://127.0.0.1:9").unwrap());
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert_eq!(
            config.absolute_url("/products/oud"),
            "http://localhost:3000/products/oud"
        );
        assert!(!config.is_secure());
    }

    #[test]
    fn test_store_defaults() {
        let store = StoreConfig::default();
        assert_eq!(store.currency, CurrencyCode::NGN);
        assert_eq!(store.currency_symbol, "₦");
        assert_eq!(store.default_shipping, ShippingMethod::Delivery);
        assert_eq!(store.products_per_page, 12);
    }
}
