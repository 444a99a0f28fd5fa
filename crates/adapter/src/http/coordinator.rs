//! Coalescing of single-record lookups into batched requests.
//!
//! Lookups made inside one [`Coordinator::run`] closure form a coalescing
//! window. The closure is synchronous, so nothing can be dispatched while the
//! window is open. When it returns, the pending lookups are grouped per
//! resource, split by the URL length limit and dispatched, one task per group.
//!
//! ```rust,ignore
//! let coordinator = Coordinator::new(transport, AdapterConfig::new().with_coalescing(true));
//! let records = coordinator.run(|window| {
//!     vec![
//!         window.find_record(&post, "my-id:1"),
//!         window.find_record(&post, "my-id:2"),
//!     ]
//! });
//! // One request: /posts?ids%5B%5D=my-id%3A1&ids%5B%5D=my-id%3A2
//! let records = futures_util::future::try_join_all(records).await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::try_join_all;
use recordstore_types::{Identifier, ResourceName};
use tokio::sync::oneshot;
use tracing::{debug, error};

use super::batcher::{partition, Group};
use super::concurrency_limiter::{get_or_create_semaphore, new_semaphore};
use super::dispatcher::{Dispatcher, Responder, Waiters};
use super::transport::Transport;
use super::url_builder::UrlBuilder;
use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::record::Record;

/// Resolves to the record requested through [`Window::find_record`].
#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct RecordFuture {
    rx: oneshot::Receiver<AdapterResult<Record>>,
}

impl Future for RecordFuture {
    type Output = AdapterResult<Record>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Dispatch task went away without answering
            Poll::Ready(Err(_)) => Poll::Ready(Err(AdapterError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug)]
struct PendingRequest {
    resource: ResourceName,
    id: Identifier,
    responder: Responder,
}

struct Inner<T: Transport> {
    dispatcher: Dispatcher<T>,
    urls: UrlBuilder,
    config: AdapterConfig,
    url_limit: Option<usize>,
}

/// Handle for issuing record lookups. Cheap to clone.
pub struct Coordinator<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T, config: AdapterConfig) -> Self {
        let urls = UrlBuilder::new(config.host.as_deref(), config.namespace.as_deref());
        let url_limit = config.url_limit();

        // Shared per target server; a relative adapter with no known endpoint
        // must not share a limit with unrelated ones
        let limiter = config.concurrency.as_ref().and_then(|limits| {
            match config.host.clone().or_else(|| transport.endpoint_key()) {
                Some(key) => get_or_create_semaphore(&key, limits),
                None => {
                    debug!("No target known for limiter, using a private one");
                    new_semaphore(limits)
                }
            }
        });

        let dispatcher = Dispatcher::new(transport)
            .with_timeout(config.request_timeout)
            .with_limiter(limiter);

        Self {
            inner: Arc::new(Inner {
                dispatcher,
                urls,
                config,
                url_limit,
            }),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.inner.urls
    }

    pub fn transport(&self) -> &T {
        self.inner.dispatcher.transport()
    }

    /// Open a coalescing window, run `f` inside it and flush it.
    ///
    /// Must be called within a Tokio runtime; otherwise every lookup of the
    /// window fails with [`AdapterError::NoRuntime`].
    ///
    /// # Arguments
    /// * `f` - Issues lookups on the window; the window closes when it returns
    ///
    /// # Returns
    /// Whatever `f` returns, typically the [`RecordFuture`]s it collected
    ///
    /// # Example
    /// ```rust,ignore
    /// let lookups = coordinator.run(|window| {
    ///     ids.iter().map(|id| window.find_record(&post, id)).collect::<Vec<_>>()
    /// });
    /// let records = futures_util::future::try_join_all(lookups).await?;
    /// ```
    pub fn run<R>(&self, f: impl FnOnce(&mut Window<'_, T>) -> R) -> R {
        let mut window = Window {
            coordinator: self,
            pending: Vec::new(),
        };
        let output = f(&mut window);
        window.flush();
        output
    }

    /// Look up one record in a window of its own.
    pub fn find_record(&self, resource: &ResourceName, id: impl Into<Identifier>) -> RecordFuture {
        self.run(|window| window.find_record(resource, id))
    }

    /// Look up several records of one resource in a single window. Futures
    /// are returned in the order of `ids`.
    pub fn find_many<I>(&self, resource: &ResourceName, ids: I) -> Vec<RecordFuture>
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        self.run(|window| {
            ids.into_iter()
                .map(|id| window.find_record(resource, id))
                .collect()
        })
    }

    /// Look up several records and wait for all of them, failing with the
    /// first error.
    pub async fn fetch_all<I>(&self, resource: &ResourceName, ids: I) -> AdapterResult<Vec<Record>>
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        try_join_all(self.find_many(resource, ids)).await
    }

    fn spawn_group(&self, group: Group, waiters: Waiters) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = self.inner.clone();
                handle.spawn(async move {
                    inner.dispatcher.dispatch_and_resolve(group, waiters).await;
                });
            }
            Err(_) => {
                error!(
                    "No Tokio runtime to dispatch {} {} id(s)",
                    group.len(),
                    group.resource()
                );
                for responder in waiters.into_iter().flat_map(|(_, r)| r) {
                    let _ = responder.send(Err(AdapterError::NoRuntime));
                }
            }
        }
    }
}

/// An open coalescing window. Only obtainable through [`Coordinator::run`].
pub struct Window<'a, T: Transport> {
    coordinator: &'a Coordinator<T>,
    pending: Vec<PendingRequest>,
}

impl<'a, T: Transport> Window<'a, T> {
    /// Request one record.
    ///
    /// With coalescing enabled the lookup is queued until the window closes.
    /// Otherwise it is dispatched right away as a group of one.
    pub fn find_record(&mut self, resource: &ResourceName, id: impl Into<Identifier>) -> RecordFuture {
        let id = id.into();
        let (responder, rx) = oneshot::channel();

        if self.coordinator.config().coalesce_find_requests {
            self.pending.push(PendingRequest {
                resource: resource.clone(),
                id,
                responder,
            });
        } else {
            let base_url = self.coordinator.urls().url_for_find_many(resource);
            let group = Group::new(resource.clone(), base_url, vec![id.clone()]);
            self.coordinator.spawn_group(group, vec![(id, vec![responder])]);
        }

        RecordFuture { rx }
    }

    /// Number of lookups queued so far
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn flush(self) {
        if self.pending.is_empty() {
            return;
        }

        let coordinator = self.coordinator;
        let total = self.pending.len();

        // Per resource, in first-seen order: distinct ids and their callers
        let mut batches: Vec<(ResourceName, Vec<Identifier>, HashMap<Identifier, Vec<Responder>>)> =
            Vec::new();

        for request in self.pending {
            let index = match batches.iter().position(|(r, _, _)| r == &request.resource) {
                Some(index) => index,
                None => {
                    batches.push((request.resource.clone(), Vec::new(), HashMap::new()));
                    batches.len() - 1
                }
            };

            let (_, ids, responders) = &mut batches[index];
            let waiting = responders.entry(request.id.clone()).or_insert_with(|| {
                ids.push(request.id.clone());
                Vec::new()
            });
            waiting.push(request.responder);
        }

        debug!(
            "Flushing coalescing window: {} lookup(s) across {} resource(s)",
            total,
            batches.len()
        );

        for (resource, ids, mut responders) in batches {
            let base_url = coordinator.urls().url_for_find_many(&resource);

            for group in partition(&resource, &ids, &base_url, coordinator.inner.url_limit) {
                let waiters: Waiters = group
                    .ids()
                    .iter()
                    .map(|id| (id.clone(), responders.remove(id).unwrap_or_default()))
                    .collect();
                coordinator.spawn_group(group, waiters);
            }
        }
    }
}
