//! Resilient request executor
//!
//! Resolves a target against the service base, issues the GET through the
//! [`Transport`], and applies the retry policy to transient statuses.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::record::{Page, Record};
use crate::retry::with_retry;
use crate::transport::Transport;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Issues GET requests against the Service Layer with bounded retry
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base: Url,
    retry: RetryConfig,
    timeout: Duration,
    page_size: u32,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base", &self.base.as_str())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl RequestExecutor {
    /// Create an executor over an authenticated transport
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Result<Self> {
        Ok(Self {
            transport,
            base: config.service.base()?,
            retry: config.retry.clone(),
            timeout: config.service.request_timeout,
            page_size: config.pagination.page_size,
        })
    }

    /// Same executor with a different per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Service base address, always ending in `/`
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Records requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Resolve a target to a full URL
    ///
    /// Absolute `http(s)` URLs are used verbatim. Anything else is a path
    /// under the service base; a leading `/` and a repeated base path (as in
    /// `/b1s/v1/Items?$skip=20`) are tolerated.
    pub fn resolve(&self, target: &str) -> Result<Url> {
        match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => return Ok(url),
            _ => {}
        }

        let relative = target.trim_start_matches('/');
        let base_path = self.base.path().trim_start_matches('/');
        let relative = match relative.strip_prefix(base_path) {
            Some(rest) if !base_path.is_empty() => rest,
            _ => relative,
        };
        Ok(self.base.join(relative)?)
    }

    /// GET `target` and return the body of the first successful attempt
    pub async fn execute_get_text(
        &self,
        target: &str,
        query: &[(String, String)],
    ) -> Result<String> {
        let url = self.resolve(target)?;
        let url = &url;
        let transport = self.transport.as_ref();
        let timeout = self.timeout;

        with_retry(&self.retry, || async move {
            tracing::debug!(url = %url, params = query.len(), "GET");
            let response = transport.get(url, query, timeout).await?;
            if response.is_success() {
                Ok(response.body)
            } else {
                Err(Error::http(response.status, url.as_str(), &response.body))
            }
        })
        .await
    }

    /// GET `target` and decode the body as a collection page
    pub async fn execute_get(&self, target: &str, query: &[(String, String)]) -> Result<Page> {
        let body = self.execute_get_text(target, query).await?;
        Page::from_body(&body)
    }

    /// GET a single entity (e.g. `Items('A1')`) and decode it as a record
    pub async fn execute_get_record(
        &self,
        target: &str,
        query: &[(String, String)],
    ) -> Result<Record> {
        let body = self.execute_get_text(target, query).await?;
        match serde_json::from_str::<Value>(&body)? {
            Value::Object(record) => Ok(record),
            other => Err(Error::Other(format!(
                "expected a JSON object from {target}, got {}",
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
