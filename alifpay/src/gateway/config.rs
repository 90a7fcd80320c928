//! Client configuration.
//!
//! Configuration is read from TOML. The terminal password never appears in
//! the file: the file names the environment variable that holds it.
//!
//! ```toml
//! base_url = "https://alifpay.tj/web"
//! terminal_id = "T1"
//! password_env = "ALIF_TERMINAL_PASSWORD"
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 100
//! max_delay_ms = 5000
//! ```

use std::{path::Path, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::{
    error::{GatewayError, Result},
    reliability::RetryPolicy,
    signing::Credential,
};

/// Production gateway.
pub const DEFAULT_BASE_URL: &str = "https://alifpay.tj/web";

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Allows plain HTTP and loopback hosts. For local test gateways only.
    #[serde(default)]
    pub allow_insecure: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: default_pool_max_idle(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            allow_insecure: false,
        }
    }
}

impl HttpConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if timeout values are outside
    /// valid ranges:
    /// - `timeout_secs`: must be 1-300 seconds
    /// - `connect_timeout_secs`: must be 1-60 seconds
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(GatewayError::Configuration(
                "timeout_secs must be between 1 and 300".to_owned(),
            ));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 60 {
            return Err(GatewayError::Configuration(
                "connect_timeout_secs must be between 1 and 60".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

const fn default_pool_max_idle() -> usize {
    100
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

/// Complete client configuration.
///
/// # Examples
///
/// ```
/// use alifpay::gateway::ClientConfig;
///
/// let config = ClientConfig::from_toml(
///     r#"
///     terminal_id = "T1"
///     password_env = "ALIF_TERMINAL_PASSWORD"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.base_url, "https://alifpay.tj/web");
/// assert_eq!(config.http.timeout_secs, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    /// Gateway base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Terminal id issued by the gateway.
    pub terminal_id: String,

    /// Name of the environment variable holding the terminal password.
    pub password_env: String,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry settings for transport failures.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if parsing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| GatewayError::Configuration(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the file cannot be read or
    /// its content is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if:
    /// - `base_url` is not a URL, or is not HTTPS while `allow_insecure` is off
    /// - `terminal_id` is empty
    /// - `password_env` is not a valid environment variable name
    /// - the HTTP or retry settings are out of bounds
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            GatewayError::Configuration(format!("invalid base_url {}: {e}", self.base_url))
        })?;
        if url.scheme() != "https" && !self.http.allow_insecure {
            return Err(GatewayError::Configuration(format!(
                "base_url must use HTTPS: {}",
                self.base_url
            )));
        }
        if self.terminal_id.trim().is_empty() {
            return Err(GatewayError::Configuration("terminal_id cannot be empty".to_owned()));
        }
        validate_env_var_name(&self.password_env)?;
        self.http.validate()?;
        self.retry.validate()
    }

    /// Builds the terminal credential, reading the password from `password_env`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the variable is unset or
    /// either value is empty.
    pub fn credential(&self) -> Result<Credential> {
        Credential::from_env(&self.terminal_id, &self.password_env)
    }
}

/// Validates an environment variable name.
fn validate_env_var_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(GatewayError::Configuration(
            "environment variable name cannot be empty".to_owned(),
        ));
    };

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(GatewayError::Configuration(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(GatewayError::Configuration(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}
