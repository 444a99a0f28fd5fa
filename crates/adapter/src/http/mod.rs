//! Batched record fetching over HTTP
//!
//! ## Module Organization
//!
//! - `batcher`: splitting identifier lists into URL-length-bounded groups
//! - `coordinator`: coalescing windows and flushing them into groups
//! - `dispatcher`: one request per group, results routed back to callers
//! - `transport`: the pluggable fetch strategy and its `reqwest` implementation
//! - `url_builder`: URL construction utilities
//! - `concurrency_limiter`: optional per-host cap on in-flight requests

pub mod batcher;
pub mod concurrency_limiter;
pub mod coordinator;
pub mod dispatcher;
pub mod transport;
pub mod url_builder;

pub use batcher::{group_for_fetch, partition, Group};
pub use concurrency_limiter::ConcurrencyLimitConfig;
pub use coordinator::{Coordinator, RecordFuture, Window};
pub use dispatcher::Dispatcher;
pub use transport::{FindManyRequest, HttpTransport, Transport};
pub use url_builder::UrlBuilder;
