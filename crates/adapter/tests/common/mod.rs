//! In-memory transport that records every find-many request it serves.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use recordstore_adapter::{AdapterError, AdapterResult, FindManyRequest, Transport};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub ids: Vec<String>,
    /// Length of `url?ids%5B%5D=...`, serialized independently of the adapter
    pub full_url_len: usize,
}

#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    failure: Mutex<Option<AdapterError>>,
    omitted: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following request fails with `err`
    pub fn fail_with(&self, err: AdapterError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    /// Leave `id` out of every following response
    pub fn omit(&self, id: &str) {
        self.omitted.lock().unwrap().insert(id.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.requests().iter().map(|r| r.full_url_len).collect()
    }

    /// Most requests that were being served at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn find_many(&self, request: &FindManyRequest) -> AdapterResult<Value> {
        let ids: Vec<String> = request.ids().iter().map(|id| id.to_string()).collect();

        let query = ids
            .iter()
            .map(|id| format!("{}={}", urlencoding::encode("ids[]"), urlencoding::encode(id)))
            .collect::<Vec<_>>()
            .join("&");
        let full_url = format!("{}?{}", request.url(), query);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // Hold the request open so overlapping groups are observable
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.requests.lock().unwrap().push(RecordedRequest {
            url: request.url().clone(),
            ids: ids.clone(),
            full_url_len: full_url.len(),
        });

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let omitted = self.omitted.lock().unwrap().clone();
        let records: Vec<Value> = ids
            .iter()
            .filter(|id| !omitted.contains(*id))
            .map(|id| json!({ "id": id }))
            .collect();

        Ok(json!({ "testRecords": records }))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
