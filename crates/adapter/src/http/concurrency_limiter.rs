//! Concurrency limiting for batched find requests
//!
//! A large coalescing window can fan out into many group requests. This module
//! optionally caps how many of them are in flight against one host at a time.
//! Limiters are keyed per host and shared by every adapter in the process that
//! talks to that host. Adapters without a host are keyed by their transport's
//! endpoint, or get a limiter of their own when the transport has none.
//!
//! ```bash
//! export RECORDSTORE_CONCURRENCY_LIMIT=4   # At most 4 group requests in flight
//! ```
//!
//! ```rust,ignore
//! use recordstore_adapter::{AdapterConfig, ConcurrencyLimitConfig};
//!
//! let config = AdapterConfig::new()
//!     .with_coalescing(true)
//!     .with_concurrency_limit(ConcurrencyLimitConfig::new(Some(4)));
//! ```

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyLimitConfig {
    /// Maximum number of group requests in flight at once. `None` or zero
    /// means unlimited.
    pub max_concurrent_requests: Option<usize>,
}

impl ConcurrencyLimitConfig {
    /// Reads `RECORDSTORE_CONCURRENCY_LIMIT`.
    ///
    /// # Returns
    /// `None` when the variable is unset or not a number
    pub fn from_env() -> Option<Self> {
        let limit = std::env::var("RECORDSTORE_CONCURRENCY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())?;

        debug!("Concurrency limit configured from environment: {}", limit);
        Some(Self::new(Some(limit)))
    }

    pub fn new(max_concurrent_requests: Option<usize>) -> Self {
        Self {
            max_concurrent_requests,
        }
    }

    /// The limit that actually applies; zero counts as unlimited
    fn effective_limit(&self) -> Option<usize> {
        self.max_concurrent_requests.filter(|&n| n > 0)
    }
}

type SharedSemaphore = Arc<Semaphore>;

#[derive(Debug)]
struct RegisteredLimit {
    limit: Option<usize>,
    semaphore: Option<SharedSemaphore>,
}

static GLOBAL_SEMAPHORES: Lazy<DashMap<String, RegisteredLimit>> = Lazy::new(DashMap::new);

/// Build a semaphore owned by the caller alone, outside the registry.
///
/// Used for adapters whose requests have no known target to share a limit on.
pub fn new_semaphore(config: &ConcurrencyLimitConfig) -> Option<SharedSemaphore> {
    config
        .effective_limit()
        .map(|n| Arc::new(Semaphore::new(n)))
}

/// Get the semaphore registered for `host`, creating it from `config` on
/// first use.
///
/// Later calls for the same host return the same instance. When their config
/// asks for a different limit, the registered one wins and a warning is logged.
///
/// # Arguments
/// * `host` - Key of the target server: a configured host or a transport origin
/// * `config` - Limit to register if `host` has no entry yet
///
/// # Returns
/// The shared semaphore, or `None` when no limit applies to `host`
///
/// # Example
/// ```rust,ignore
/// let config = ConcurrencyLimitConfig::new(Some(4));
/// let a = get_or_create_semaphore("https://api.example.com", &config);
/// let b = get_or_create_semaphore("https://api.example.com", &config);
/// assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
/// ```
pub fn get_or_create_semaphore(
    host: &str,
    config: &ConcurrencyLimitConfig,
) -> Option<SharedSemaphore> {
    let registered = GLOBAL_SEMAPHORES
        .entry(host.to_string())
        .or_insert_with(|| {
            debug!(
                "Creating request semaphore for host {}: {:?} concurrent",
                host,
                config.effective_limit()
            );

            RegisteredLimit {
                limit: config.effective_limit(),
                semaphore: new_semaphore(config),
            }
        });

    if registered.limit != config.effective_limit() {
        warn!(
            "Concurrency limit {:?} for host {} ignored; {:?} is already registered",
            config.effective_limit(),
            host,
            registered.limit
        );
    }

    registered.semaphore.clone()
}
