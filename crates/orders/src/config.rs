//! Orders configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (fallback: `DATABASE_URL`)
//! - `STORE_COUNTRY` - Numeric ISO-3166 country of the store (default: 840)
//! - `STORE_CURRENCY` - Currency for new orders (default: USD)
//! - `ORDER_STATUSES_FILE` - YAML file with custom states and statuses
//! - `CHECKOUT_COMPLETE_STATE` - State entered when checkout completes (default: `post_checkout`)
//! - `CAPITALIZE_ADDRESS` - Upper-case formatted addresses (default: false)
//! - `LOG_FORMAT` - `text` or `json` (default: text)

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use storekeep_core::CurrencyCode;
use thiserror::Error;

use crate::registry::{StateId, states};

const DEFAULT_STORE_COUNTRY: u16 = 840;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One flattened JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected text or json, got {other}")),
        }
    }
}

/// Orders configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct OrdersConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Store country, used as the default address country
    pub store_country: u16,
    /// Currency stamped on new orders
    pub store_currency: CurrencyCode,
    /// Custom status definitions merged into the built-in registry
    pub statuses_file: Option<PathBuf>,
    /// State whose default status completed checkouts receive
    pub checkout_complete_state: StateId,
    /// Upper-case formatted addresses
    pub capitalize_addresses: bool,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for OrdersConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("store_country", &self.store_country)
            .field("store_currency", &self.store_currency)
            .field("statuses_file", &self.statuses_file)
            .field("checkout_complete_state", &self.checkout_complete_state)
            .field("capitalize_addresses", &self.capitalize_addresses)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            store_country: DEFAULT_STORE_COUNTRY,
            store_currency: CurrencyCode::USD,
            statuses_file: None,
            checkout_complete_state: StateId::new(states::POST_CHECKOUT),
            capitalize_addresses: false,
            log_format: LogFormat::Text,
        }
    }
}

impl OrdersConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = get("ORDERS_DATABASE_URL")
            .or_else(|| get("DATABASE_URL"))
            .map(SecretString::from);
        let store_country = parse_or("STORE_COUNTRY", get("STORE_COUNTRY"), DEFAULT_STORE_COUNTRY)?;
        let store_currency = parse_or("STORE_CURRENCY", get("STORE_CURRENCY"), CurrencyCode::USD)?;
        let statuses_file = get("ORDER_STATUSES_FILE").map(PathBuf::from);
        let checkout_complete_state = get("CHECKOUT_COMPLETE_STATE")
            .map_or_else(|| StateId::new(states::POST_CHECKOUT), StateId::from);
        let capitalize_addresses = match get("CAPITALIZE_ADDRESS") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                ConfigError::InvalidEnvVar("CAPITALIZE_ADDRESS".to_string(), format!("not a boolean: {value}"))
            })?,
            None => false,
        };
        let log_format = parse_or("LOG_FORMAT", get("LOG_FORMAT"), LogFormat::Text)?;

        Ok(Self {
            database_url,
            store_country,
            store_currency,
            statuses_file,
            checkout_complete_state,
            capitalize_addresses,
            log_format,
        })
    }

    /// The database URL, which commands that touch `PostgreSQL` need.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no URL is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("ORDERS_DATABASE_URL".to_string()))
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
