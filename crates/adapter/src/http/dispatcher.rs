//! Issues one request per group and routes the results back to callers.

use std::sync::Arc;
use std::time::Duration;

use recordstore_types::Identifier;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, instrument, warn};

use super::batcher::Group;
use super::transport::{FindManyRequest, Transport};
use crate::error::{AdapterError, AdapterResult};
use crate::record::{BatchResponse, Record};

/// Sending half of a caller's pending lookup
pub type Responder = oneshot::Sender<AdapterResult<Record>>;

/// Callers waiting on one id of a group, in request order
pub type Waiters = Vec<(Identifier, Vec<Responder>)>;

#[derive(Debug)]
pub struct Dispatcher<T: Transport> {
    transport: T,
    timeout: Option<Duration>,
    limiter: Option<Arc<Semaphore>>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: None,
            limiter: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limiter(mut self, limiter: Option<Arc<Semaphore>>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch one group and split the payload into records.
    ///
    /// Transport failures, timeouts and undecodable payloads fail the group
    /// as a whole.
    #[instrument(
        name = "recordstore.dispatch",
        skip(self, group),
        fields(
            resource = %group.resource(),
            ids = group.len(),
            url_len = group.url_len()
        ),
        err
    )]
    pub async fn dispatch(&self, group: &Group) -> AdapterResult<BatchResponse> {
        let request = FindManyRequest::from_group(group);

        let _permit = match &self.limiter {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| AdapterError::Cancelled)?,
            ),
            None => None,
        };

        let fetch = self.transport.find_many(&request);
        let payload = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fetch).await.map_err(|_| {
                AdapterError::Timeout {
                    url: request.url().clone(),
                    after_ms: limit.as_millis(),
                }
            })??,
            None => fetch.await?,
        };

        BatchResponse::from_payload(group.resource(), payload)
    }

    /// Dispatch `group` and answer every waiter.
    ///
    /// A failed group rejects all of its waiters with the same error. A
    /// successful group resolves each waiter with its record, or with
    /// [`AdapterError::MissingRecord`] when the response left it out.
    pub async fn dispatch_and_resolve(&self, group: Group, waiters: Waiters) {
        match self.dispatch(&group).await {
            Ok(mut response) => {
                debug!(
                    "Resolving {} waiter id(s) for {} from {} record(s)",
                    waiters.len(),
                    group.resource(),
                    response.len()
                );
                for (id, responders) in waiters {
                    let result = response.take(&id);
                    if let Err(err) = &result {
                        warn!("{}", err);
                    }
                    for responder in responders {
                        // The caller may have dropped its future
                        let _ = responder.send(result.clone());
                    }
                }
            }
            Err(err) => {
                warn!(
                    "Request for {} {} id(s) failed: {}",
                    group.len(),
                    group.resource(),
                    err
                );
                for responder in waiters.into_iter().flat_map(|(_, r)| r) {
                    let _ = responder.send(Err(err.clone()));
                }
            }
        }
    }
}
