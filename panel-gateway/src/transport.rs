//! Engine transport: the request/response function the pipelines call.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Query endpoint of the engine's HTTP API.
pub const QUERY_PATH: &str = "/api/query";
/// Name/value suggestion endpoint.
pub const SUGGEST_PATH: &str = "/api/suggest";
/// Stats endpoint used for connection checks.
pub const STATS_PATH: &str = "/api/stats";
/// Annotations endpoint (pass-through).
pub const ANNOTATIONS_PATH: &str = "/api/annotations";

/// Async request/response channel to the storage engine's HTTP API.
///
/// The core only ever POSTs JSON to the query and suggestion endpoints
/// and GETs the stats and annotations endpoints. Timeouts and
/// cancellation are this collaborator's concern, not the pipelines'.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON document, returning the raw response body.
    async fn post(&self, path: &str, body: Value) -> Result<String>;
    /// GET a path, returning the raw response body.
    async fn get(&self, path: &str) -> Result<String>;
}

// ------------------------------------------------------------------ //
//  HttpTransport                                                      //
// ------------------------------------------------------------------ //

/// `reqwest`-backed transport talking to a single engine base URL.
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<String> {
        let resp = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("reading {path} response body"))?;
        if !status.is_success() {
            return Err(anyhow!("engine returned {status} for {path}: {text}"));
        }
        Ok(text)
    }

    async fn get(&self, path: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("reading {path} response body"))?;
        if !status.is_success() {
            return Err(anyhow!("engine returned {status} for {path}: {text}"));
        }
        Ok(text)
    }
}

// ------------------------------------------------------------------ //
//  FakeTransport (for tests)                                          //
// ------------------------------------------------------------------ //

/// A request observed by [`FakeTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// In-memory transport that replays canned responses and records every
/// request for assertions.
///
/// Responses are keyed so concurrently running pipelines stay
/// deterministic: query documents key on their metric name, suggest
/// documents on their `select` kind, GETs on the path. Multiple
/// responses queued under one key replay in order.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response body under `key`.
    pub fn respond(&self, key: &str, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(Ok(body.into()));
    }

    /// Queue a transport-level failure under `key`.
    pub fn fail(&self, key: &str, message: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(Err(message.into()));
    }

    /// Snapshot of every request seen so far, in arrival order.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn key_of(path: &str, body: Option<&Value>) -> String {
        let from_body = body.and_then(|b| {
            b.get("select")
                .and_then(Value::as_str)
                .or_else(|| b.pointer("/group-aggregate/metric").and_then(Value::as_str))
                .map(str::to_string)
        });
        from_body.unwrap_or_else(|| path.to_string())
    }

    fn next(&self, key: &str) -> Result<String> {
        match self
            .responses
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
        {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no canned response for {key:?}")),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post(&self, path: &str, body: Value) -> Result<String> {
        let key = Self::key_of(path, Some(&body));
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            body: Some(body),
        });
        self.next(&key)
    }

    async fn get(&self, path: &str) -> Result<String> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            body: None,
        });
        self.next(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn keyed_responses_replay_in_order() {
        let fake = FakeTransport::new();
        fake.respond("cpu.load", "first");
        fake.respond("cpu.load", "second");

        let body = json!({"select": "cpu.load"});
        assert_eq!(fake.post(QUERY_PATH, body.clone()).await.unwrap(), "first");
        assert_eq!(fake.post(QUERY_PATH, body).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn group_aggregate_documents_key_on_metric() {
        let fake = FakeTransport::new();
        fake.respond("mem.free", "ok");
        let body = json!({"group-aggregate": {"metric": "mem.free", "step": "10s"}});
        assert_eq!(fake.post(QUERY_PATH, body).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn missing_response_is_an_error() {
        let fake = FakeTransport::new();
        let err = fake.get(STATS_PATH).await.unwrap_err();
        assert!(err.to_string().contains(STATS_PATH));
    }

    #[tokio::test]
    async fn records_requests_in_arrival_order() {
        let fake = FakeTransport::new();
        fake.respond(STATS_PATH, "+ok");
        let _ = fake.get(STATS_PATH).await;
        let recorded = fake.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, "GET");
        assert_eq!(recorded[0].path, STATS_PATH);
    }
}
