//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::ClientError;

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "CARADOC_API_URL";

/// Environment variable holding the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "CARADOC_TIMEOUT_SECS";

/// Connection settings for [`CaradocClient`](crate::client::CaradocClient).
///
/// # Example
/// ```rust
/// use caradoc::options::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::new("http://localhost:8000")
///     .with_timeout(Duration::from_secs(30))
///     .with_header("X-Request-Source".to_string(), "cli".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Whole-request timeout. Streamed responses are bounded by it too.
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Load options from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var(API_URL_ENV)
            .map_err(|_| ClientError::Config(format!("{API_URL_ENV} must be set")))?;
        let options = Self::new(base_url);

        match std::env::var(TIMEOUT_ENV) {
            Ok(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    ClientError::Config(format!("{TIMEOUT_ENV} must be a number of seconds, got {raw:?}"))
                })?;
                Ok(options.with_timeout(Duration::from_secs(secs)))
            }
            Err(_) => Ok(options),
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let options = ClientOptions::new("http://api")
            .with_timeout(Duration::from_secs(5))
            .with_header("a".to_string(), "1".to_string())
            .with_header("b".to_string(), "2".to_string());

        assert_eq!(options.base_url, "http://api");
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.extra_headers.unwrap().len(), 2);
    }
}
