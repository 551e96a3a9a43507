//! Client configuration.
//!
//! All connection settings, including the HTTP proxy, are passed in
//! explicitly. Nothing is read from the process environment by this crate;
//! front ends that want environment-driven configuration layer it on top
//! (see the `mqs` command line).

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 35;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 3;

/// Configuration for an MQS client.
///
/// # Examples
///
/// ```
/// use mqs_client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_endpoint("http://1234.mqs-cn-hangzhou.aliyuncs.com")
///     .with_credentials("access-key-id", "access-key-secret")
///     .with_timeout_seconds(60);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service base URL, e.g. `http://<owner>.mqs-cn-hangzhou.aliyuncs.com`
    pub endpoint: String,
    /// Public half of the access key pair
    pub access_key_id: String,
    /// Secret half of the access key pair
    pub access_key_secret: String,
    /// Whole-request timeout, in seconds
    pub timeout_seconds: u64,
    /// Connection establishment timeout, in seconds
    pub connect_timeout_seconds: u64,
    /// HTTP proxy URL for all requests
    pub proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            proxy: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for client configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Set the service endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the access key pair.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.access_key_secret = access_key_secret.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Check that the configuration can be used to build a client.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if:
    /// - the endpoint or either half of the access key is empty
    /// - the endpoint or proxy is not an http(s) URL
    /// - a timeout is zero
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "endpoint".to_string(),
            });
        }
        check_http_url("endpoint", &self.endpoint)?;

        if self.access_key_id.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "access_key_id".to_string(),
            });
        }

        if self.access_key_secret.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "access_key_secret".to_string(),
            });
        }

        if self.timeout_seconds == 0 || self.connect_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                message: "timeouts must be at least one second".to_string(),
            });
        }

        if let Some(proxy) = &self.proxy {
            check_http_url("proxy", proxy)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("proxy", &self.proxy)
            .finish()
    }
}

fn check_http_url(key: &str, value: &str) -> Result<(), ConfigurationError> {
    let url = url::Url::parse(value).map_err(|e| ConfigurationError::Parsing {
        message: format!("{} '{}' is not a valid URL: {}", key, value, e),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigurationError::Invalid {
            message: format!("{} must use http or https, got '{}'", key, scheme),
        }),
    }
}

/// Builder for constructing `ClientConfig` instances.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new configuration builder with defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the service endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the access key id.
    pub fn access_key_id(mut self, access_key_id: impl Into<String>) -> Self {
        self.config.access_key_id = access_key_id.into();
        self
    }

    /// Set the access key secret.
    pub fn access_key_secret(mut self, access_key_secret: impl Into<String>) -> Self {
        self.config.access_key_secret = access_key_secret.into();
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set the connect timeout in seconds.
    pub fn connect_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.connect_timeout_seconds = seconds;
        self
    }

    /// Route all requests through a proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
