use recordstore_types::{Identifier, ResourceName};
use thiserror::Error;

/// Errors surfaced to callers of the adapter.
///
/// Every caller of a failed group receives its own clone of the same value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Transport error while requesting {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out after {after_ms}ms")]
    Timeout { url: String, after_ms: u128 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response did not contain {resource} record with id '{id}'")]
    MissingRecord { resource: String, id: String },

    #[error("Invalid adapter configuration: {0}")]
    Configuration(String),

    #[error("No Tokio runtime available to dispatch the request")]
    NoRuntime,

    #[error("Request was dropped before a response arrived")]
    Cancelled,
}

impl AdapterError {
    pub fn missing_record(resource: &ResourceName, id: &Identifier) -> Self {
        Self::MissingRecord {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether this error was shared by every caller of the failed group
    pub fn is_group_failure(&self) -> bool {
        !matches!(self, Self::MissingRecord { .. })
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
