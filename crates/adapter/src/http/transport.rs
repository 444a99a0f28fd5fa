//! The fetch strategy behind the dispatcher.
//!
//! [`HttpTransport`] talks to a real server with `reqwest`. Tests and
//! embedders can plug in any other [`Transport`].

use async_trait::async_trait;
use derive_getters::Getters;
use recordstore_types::{Identifier, ResourceName};
use reqwest::{header::ACCEPT, Client};
use serde_json::Value;
use tap::TapFallible;
use tracing::{instrument, trace};
use url::Url;

use super::batcher::Group;
use super::url_builder::UrlBuilder;
use crate::error::{AdapterError, AdapterResult};

/// One batched GET: `url?ids%5B%5D=...` for the ids of a group.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct FindManyRequest {
    resource: ResourceName,
    url: String,
    ids: Vec<Identifier>,
}

impl FindManyRequest {
    pub fn new(resource: ResourceName, url: impl Into<String>, ids: Vec<Identifier>) -> Self {
        Self {
            resource,
            url: url.into(),
            ids,
        }
    }

    pub fn from_group(group: &Group) -> Self {
        Self::new(
            group.resource().clone(),
            group.base_url().clone(),
            group.ids().clone(),
        )
    }

    pub fn full_url(&self) -> String {
        UrlBuilder::full_url(&self.url, &self.ids)
    }
}

/// Performs find-many requests and returns the decoded JSON body.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn find_many(&self, request: &FindManyRequest) -> AdapterResult<Value>;

    /// Origin that relative request URLs end up at, if the transport knows it.
    ///
    /// Adapters without a configured host share a concurrency limiter with
    /// every other adapter reporting the same key.
    fn endpoint_key(&self) -> Option<String> {
        None
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn find_many(&self, request: &FindManyRequest) -> AdapterResult<Value> {
        (**self).find_many(request).await
    }

    fn endpoint_key(&self) -> Option<String> {
        (**self).endpoint_key()
    }
}

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base that relative request URLs are resolved against
    endpoint: Option<Url>,
    http: Client,
}

impl HttpTransport {
    /// Transport for adapters that build absolute URLs (a configured host).
    pub fn new() -> AdapterResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| AdapterError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: None,
            http,
        })
    }

    /// Transport that resolves relative URLs such as `/testRecords` against
    /// `endpoint`.
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the server, e.g. `http://localhost:4200/`
    ///
    /// # Example
    /// ```rust,ignore
    /// let transport = HttpTransport::with_endpoint(Url::parse("http://localhost:4200/")?)?;
    /// let coordinator = Coordinator::new(transport, AdapterConfig::new().with_coalescing(true));
    /// ```
    pub fn with_endpoint(endpoint: Url) -> AdapterResult<Self> {
        let mut transport = Self::new()?;
        transport.endpoint = Some(endpoint);
        Ok(transport)
    }

    /// Use an existing client, e.g. one with custom headers or TLS settings.
    pub fn with_client(http: Client, endpoint: Option<Url>) -> Self {
        Self { endpoint, http }
    }

    fn resolve(&self, url: &str) -> AdapterResult<Url> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }

        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            AdapterError::Configuration(format!(
                "relative URL '{}' needs a transport endpoint",
                url
            ))
        })?;

        endpoint
            .join(url)
            .map_err(|e| AdapterError::Configuration(format!("invalid URL '{}': {}", url, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        name = "recordstore.transport.find_many",
        skip(self, request),
        fields(
            resource = %request.resource(),
            url = %request.url(),
            ids = request.ids().len()
        ),
        err
    )]
    async fn find_many(&self, request: &FindManyRequest) -> AdapterResult<Value> {
        let url = self.resolve(&request.full_url())?;
        let transport_err = |e: reqwest::Error| AdapterError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let res = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_err)?;

        let status = res.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = res.text().await.map_err(transport_err)?;
        trace!("find_many response from {}: {}", url, text);

        serde_json::from_str::<Value>(&text)
            .map_err(|e| AdapterError::MalformedResponse(format!("invalid JSON: {}", e)))
            .tap_err(|e| {
                tracing::error!("failed to parse response from {} ({}): {}", url, e, text);
            })
    }

    fn endpoint_key(&self) -> Option<String> {
        self.endpoint
            .as_ref()
            .map(|endpoint| endpoint.origin().ascii_serialization())
    }
}
