//! Shared test helpers: a transport that replays canned responses.

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::error::{Error, Result};
use crate::transport::{RawResponse, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

type RecordedRequest = (String, Vec<(String, String)>);

/// Replays responses in order, then falls back to `repeat` (if any)
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<RawResponse>>,
    repeat: Option<RawResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<RawResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn repeating(response: RawResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(vec![])
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs and query parameters seen so far, in call order
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// A 200 response carrying a collection page
pub(crate) fn page_json(records: &[serde_json::Value], next_link: Option<&str>) -> RawResponse {
    let mut body = serde_json::json!({ "value": records });
    if let Some(link) = next_link {
        body["@odata.nextLink"] = serde_json::Value::String(link.to_string());
    }
    RawResponse {
        status: 200,
        body: body.to_string(),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(
        &self,
        url: &Url,
        query: &[(String, String)],
        _timeout: Duration,
    ) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), query.to_vec()));

        let next = self.script.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone())
            .ok_or_else(|| Error::Other(format!("script exhausted at {url}")))
    }
}
