//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `CARTIFY_API_BASE_URL` - Marketplace API origin (default: `https://carttifys-1.onrender.com`)
//! - `CARTIFY_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `CARTIFY_RETRY_NETWORK_ERRORS` - Retry once when a request cannot be sent (default: true)
//! - `CARTIFY_LOGIN_PATH` - Where an expired session should send the user (default: `/login`)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default marketplace API origin.
pub const DEFAULT_API_BASE_URL: &str = "https://carttifys-1.onrender.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

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
    /// API origin; endpoint paths such as `/api/buyer/cart` are joined onto it
    pub api_base_url: Url,
    /// Timeout applied to every request except the health probe
    pub request_timeout: Duration,
    /// Retry a request once if it failed before reaching the server
    pub retry_network_errors: bool,
    /// Login route reported when the session expires
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL)
                .unwrap_or_else(|_| unreachable!("default base URL is valid")),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_network_errors: true,
            login_path: "/login".to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at a specific API origin, other settings default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url("CARTIFY_API_BASE_URL", base_url)?,
            ..Self::default()
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let api_base_url = parse_base_url(
            "CARTIFY_API_BASE_URL",
            &env.or_default("CARTIFY_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;

        let timeout_secs = env
            .or_default("CARTIFY_REQUEST_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CARTIFY_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CARTIFY_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let retry_network_errors = parse_bool(
            "CARTIFY_RETRY_NETWORK_ERRORS",
            &env.or_default("CARTIFY_RETRY_NETWORK_ERRORS", "true"),
        )?;

        let login_path = env.or_default("CARTIFY_LOGIN_PATH", "/login");

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            retry_network_errors,
            login_path,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        (self.0)(key)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Parse an API origin; a trailing slash is added so relative joins keep the path.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
