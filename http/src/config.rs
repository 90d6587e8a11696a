//! Configuration management for the HTTP transport.

use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix joined in front of relative record URLs
    pub base_url: Option<String>,
    /// URL root of the collection the command line client lists
    pub url_root: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("RESTRECORD_BASE_URL").ok();
        if let Some(url) = &base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidBaseUrl(url.clone()));
            }
        }

        let url_root = env::var("RESTRECORD_URL_ROOT").ok();

        let timeout = match env::var("RESTRECORD_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let user_agent = env::var("RESTRECORD_USER_AGENT")
            .unwrap_or_else(|_| format!("restrecord/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            base_url,
            url_root,
            timeout: Duration::from_secs(timeout),
            user_agent,
        })
    }

    /// The URL root, required by the command line client.
    pub fn require_url_root(&self) -> Result<&str, ConfigError> {
        self.url_root
            .as_deref()
            .ok_or(ConfigError::MissingUrlRoot)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            url_root: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("restrecord/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RESTRECORD_URL_ROOT environment variable is required")]
    MissingUrlRoot,

    #[error("Invalid RESTRECORD_BASE_URL value: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid RESTRECORD_TIMEOUT_SECS value")]
    InvalidTimeout,
}
