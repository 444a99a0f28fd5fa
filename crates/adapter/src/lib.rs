//! REST adapter that coalesces single-record lookups into batched
//! `find-many` requests.
//!
//! Lookups issued inside one coalescing window are grouped per resource and
//! split so that no request URL exceeds the configured maximum length. Each
//! caller gets its own [`RecordFuture`] back, resolved from the combined
//! response of its group.
//!
//! # Example
//! ```ignore
//! use recordstore_adapter::prelude::*;
//!
//! let transport = HttpTransport::with_endpoint("http://localhost:4200".parse()?)?;
//! let coordinator = Coordinator::new(transport, AdapterConfig::from_env().with_coalescing(true));
//! let post = ResourceName::new("post")?;
//!
//! let lookups = coordinator.run(|window| {
//!     (1..=100).map(|id| window.find_record(&post, id)).collect::<Vec<_>>()
//! });
//! let posts = futures_util::future::try_join_all(lookups).await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod record;

pub mod prelude {
    pub use crate::config::AdapterConfig;
    pub use crate::error::{AdapterError, AdapterResult};
    pub use crate::http::{
        ConcurrencyLimitConfig, Coordinator, HttpTransport, RecordFuture, Transport, Window,
    };
    pub use crate::record::Record;
    pub use recordstore_types::{Identifier, ResourceName};
}

pub use config::{AdapterConfig, DEFAULT_MAX_URL_LENGTH};
pub use error::{AdapterError, AdapterResult};
pub use http::*;
pub use record::{BatchResponse, Record};
pub use recordstore_types::{Identifier, ResourceName, TypeError};
