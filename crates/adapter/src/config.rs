//! Adapter configuration
//!
//! All settings have defaults and can be overridden in code or through
//! environment variables:
//!
//! ```bash
//! export RECORDSTORE_MAX_URL_LENGTH=2048
//! export RECORDSTORE_COALESCE_FIND_REQUESTS=true
//! export RECORDSTORE_HOST=https://api.example.com
//! export RECORDSTORE_NAMESPACE=api/v1
//! export RECORDSTORE_REQUEST_TIMEOUT_MS=30000
//! export RECORDSTORE_CONCURRENCY_LIMIT=4
//! ```

use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::http::concurrency_limiter::ConcurrencyLimitConfig;

/// Longest URL the adapter produces by default
pub const DEFAULT_MAX_URL_LENGTH: i64 = 2048;

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Upper bound on the full request URL length of a batched find.
    /// Zero or negative disables splitting.
    pub max_url_length: i64,
    /// Merge record lookups issued in one window into batched requests
    pub coalesce_find_requests: bool,
    /// Scheme and authority prepended to every URL, e.g. `https://api.example.com`
    pub host: Option<String>,
    /// Path prefix between host and resource path, e.g. `api/v1`
    pub namespace: Option<String>,
    /// Applied to each group request
    pub request_timeout: Option<Duration>,
    pub concurrency: Option<ConcurrencyLimitConfig>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_url_length: DEFAULT_MAX_URL_LENGTH,
            coalesce_find_requests: false,
            host: None,
            namespace: None,
            request_timeout: None,
            concurrency: None,
        }
    }
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config from the defaults overlaid with `RECORDSTORE_*`
    /// environment variables. Values that fail to parse are ignored.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `RECORDSTORE_MAX_URL_LENGTH` | `max_url_length` |
    /// | `RECORDSTORE_COALESCE_FIND_REQUESTS` | `coalesce_find_requests` |
    /// | `RECORDSTORE_HOST` | `host` |
    /// | `RECORDSTORE_NAMESPACE` | `namespace` |
    /// | `RECORDSTORE_REQUEST_TIMEOUT_MS` | `request_timeout` |
    /// | `RECORDSTORE_CONCURRENCY_LIMIT` | `concurrency` |
    ///
    /// # Example
    /// ```rust,ignore
    /// // RECORDSTORE_COALESCE_FIND_REQUESTS=true RECORDSTORE_MAX_URL_LENGTH=4096
    /// let config = AdapterConfig::from_env();
    /// config.validate()?;
    /// let coordinator = Coordinator::new(HttpTransport::new()?, config);
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(max) = env_parse::<i64>("RECORDSTORE_MAX_URL_LENGTH") {
            config.max_url_length = max;
        }
        if let Some(coalesce) = env_parse::<bool>("RECORDSTORE_COALESCE_FIND_REQUESTS") {
            config.coalesce_find_requests = coalesce;
        }
        config.host = std::env::var("RECORDSTORE_HOST").ok().filter(|s| !s.is_empty());
        config.namespace = std::env::var("RECORDSTORE_NAMESPACE")
            .ok()
            .filter(|s| !s.is_empty());
        config.request_timeout =
            env_parse::<u64>("RECORDSTORE_REQUEST_TIMEOUT_MS").map(Duration::from_millis);
        config.concurrency = ConcurrencyLimitConfig::from_env();

        debug!("Adapter configured from environment: {:?}", config);
        config
    }

    pub fn with_max_url_length(mut self, max_url_length: i64) -> Self {
        self.max_url_length = max_url_length;
        self
    }

    pub fn with_coalescing(mut self, coalesce_find_requests: bool) -> Self {
        self.coalesce_find_requests = coalesce_find_requests;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_concurrency_limit(mut self, concurrency: ConcurrencyLimitConfig) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Check the URL length bound.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.max_url_length <= 0 {
            return Err(AdapterError::Configuration(format!(
                "max_url_length must be positive, got {}",
                self.max_url_length
            )));
        }
        Ok(())
    }

    /// URL length bound handed to the batcher.
    ///
    /// An invalid bound is not fatal: it is logged and batching falls back to
    /// a single group per resource.
    pub fn url_limit(&self) -> Option<usize> {
        match self.validate() {
            Ok(()) => usize::try_from(self.max_url_length).ok(),
            Err(err) => {
                warn!("{}; sending each batch as a single request", err);
                None
            }
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable value for {}: {:?}", key, raw);
            None
        }
    }
}
