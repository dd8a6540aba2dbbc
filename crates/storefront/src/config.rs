//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the defaults target a local Medusa dev server.
//!
//! ## Medusa
//! - `MEDUSA_BACKEND_URL` - Medusa base URL (default: `http://localhost:9000`,
//!   falls back to `NUXT_PUBLIC_MEDUSA_URL`)
//! - `MEDUSA_PUBLISHABLE_KEY` - Store API publishable key (falls back to
//!   `NUXT_PUBLIC_MEDUSA_PUBLISHABLE_KEY`)
//! - `MEDUSA_PAYMENT_PROVIDER` - Default payment provider (default: `pp_system_default`)
//! - `MEDUSA_TIMEOUT_SECS` - HTTP client timeout (default: 30)
//!
//! ## Server
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: `http://localhost:3000`)
//!
//! ## Error Tracking
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Environment tag (e.g., production)
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.1)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MEDUSA_URL: &str = "http://localhost:9000";
const DEFAULT_PAYMENT_PROVIDER: &str = "pp_system_default";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Medusa issues publishable keys with this prefix.
const PUBLISHABLE_KEY_PREFIX: &str = "pk_";

/// Fragments that only appear in keys copied from docs or `.env.example`.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "your",
    "xxx",
    "replace",
    "changeme",
    "placeholder",
    "example",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid Medusa publishable key: {0}")]
    InvalidPublishableKey(String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Medusa Store API configuration
    pub medusa: MedusaConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Medusa Store API configuration.
///
/// Implements `Debug` manually to redact the publishable key.
#[derive(Clone)]
pub struct MedusaConfig {
    /// Medusa base URL (e.g., `https://api.ilyo.shop`)
    pub url: String,
    /// Publishable API key sent as `x-publishable-api-key`
    pub publishable_key: Option<SecretString>,
    /// Provider used when initiating payment sessions
    pub payment_provider: String,
    /// Request timeout for the HTTP client
    pub timeout: Duration,
}

impl std::fmt::Debug for MedusaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedusaConfig")
            .field("url", &self.url)
            .field(
                "publishable_key",
                &self.publishable_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("payment_provider", &self.payment_provider)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for MedusaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MEDUSA_URL.to_string(),
            publishable_key: None,
            payment_provider: DEFAULT_PAYMENT_PROVIDER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for StorefrontConfig {
    /// The local development defaults, with Sentry disabled.
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            medusa: MedusaConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable fails to parse or the publishable
    /// key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parsed_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parsed_env("STOREFRONT_PORT", "3000")?;
        let base_url = url_env("STOREFRONT_BASE_URL", None, "http://localhost:3000")?;

        let medusa = MedusaConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            medusa,
            sentry_dsn: env("SENTRY_DSN"),
            sentry_environment: env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parsed_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parsed_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl MedusaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = url_env(
            "MEDUSA_BACKEND_URL",
            Some("NUXT_PUBLIC_MEDUSA_URL"),
            DEFAULT_MEDUSA_URL,
        )?;

        let publishable_key = env("MEDUSA_PUBLISHABLE_KEY")
            .or_else(|| env("NUXT_PUBLIC_MEDUSA_PUBLISHABLE_KEY"))
            .map(|key| validate_publishable_key(&key).map(|()| SecretString::from(key)))
            .transpose()?;

        let timeout_secs: u64 =
            parsed_env("MEDUSA_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())?;

        Ok(Self {
            url,
            publishable_key,
            payment_provider: env("MEDUSA_PAYMENT_PROVIDER")
                .unwrap_or_else(|| DEFAULT_PAYMENT_PROVIDER.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// A set, non-blank environment variable.
fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, env(key).as_deref().unwrap_or(default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// An absolute URL from `key` (or its legacy name), without a trailing slash.
fn url_env(key: &str, legacy: Option<&str>, default: &str) -> Result<String, ConfigError> {
    let raw = env(key)
        .or_else(|| legacy.and_then(env))
        .unwrap_or_else(|| default.to_string());
    url::Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn validate_publishable_key(key: &str) -> Result<(), ConfigError> {
    if !key.starts_with(PUBLISHABLE_KEY_PREFIX) {
        return Err(ConfigError::InvalidPublishableKey(format!(
            "expected a key starting with '{PUBLISHABLE_KEY_PREFIX}'"
        )));
    }

    let lower = key.to_lowercase();
    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(ConfigError::InvalidPublishableKey(format!(
            "looks like a placeholder (contains '{marker}')"
        )));
    }

    Ok(())
}
