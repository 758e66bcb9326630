//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NEXUS_API_BASE_URL` - Base URL of the commerce API (e.g. `http://127.0.0.1:8000/api/`)
//!
//! ## Optional
//! - `NEXUS_STORAGE_DIR` - Directory for persisted session and cart (default: .nexus-market)
//! - `NEXUS_RENEWAL_TIMEOUT_SECS` - Bound on one token renewal (default: 10)
//! - `NEXUS_REQUEST_TIMEOUT_SECS` - Bound on one API request (default: 30)
//! - `NEXUS_CATALOG_CACHE_TTL_SECS` - Product and shop cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_DIR: &str = ".nexus-market";
const DEFAULT_RENEWAL_TIMEOUT_SECS: &str = "10";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "30";
const DEFAULT_CATALOG_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Commerce API base URL, always ending in `/`
    pub api_base_url: Url,
    /// Directory holding the persisted session and cart
    pub storage_dir: PathBuf,
    /// Bound on one token renewal
    pub renewal_timeout: Duration,
    /// Bound on one API request
    pub request_timeout: Duration,
    /// Catalog cache lifetime
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(&get_required_env(&lookup, "NEXUS_API_BASE_URL")?)?;
        let storage_dir = PathBuf::from(get_env_or_default(
            &lookup,
            "NEXUS_STORAGE_DIR",
            DEFAULT_STORAGE_DIR,
        ));

        Ok(Self {
            api_base_url,
            storage_dir,
            renewal_timeout: get_duration_secs(
                &lookup,
                "NEXUS_RENEWAL_TIMEOUT_SECS",
                DEFAULT_RENEWAL_TIMEOUT_SECS,
            )?,
            request_timeout: get_duration_secs(
                &lookup,
                "NEXUS_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            catalog_cache_ttl: get_duration_secs(
                &lookup,
                "NEXUS_CATALOG_CACHE_TTL_SECS",
                DEFAULT_CATALOG_CACHE_TTL_SECS,
            )?,
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
        })
    }

    /// Configuration for `api_base_url` with every other setting at its
    /// default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn for_base_url(api_base_url: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| (key == "NEXUS_API_BASE_URL").then(|| api_base_url.to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Get a whole number of seconds, rejecting zero.
fn get_duration_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<Duration, ConfigError> {
    let secs = get_env_or_default(lookup, key, default)
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse the API base URL so relative paths join beneath it.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("NEXUS_API_BASE_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
