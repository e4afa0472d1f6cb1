//! HTTP transport
//!
//! The request executor only needs "GET this URL with these query parameters
//! and give me the status and body". [`Transport`] is that seam; the real
//! implementation is [`HttpTransport`], a cookie-session `reqwest` client that
//! has already logged into the Service Layer.

use crate::config::{Config, PaginationConfig, ServiceConfig};
use crate::error::{Error, Result, truncate_body};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Status and body of a completed HTTP exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// Response status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// True for statuses below 400
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// An authenticated transport able to issue GET requests
///
/// Implementations must be safe to share across concurrent lookups.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one GET. Any status is returned as a [`RawResponse`]; only
    /// failures to complete the exchange (connect, timeout) are errors.
    async fn get(
        &self,
        url: &Url,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse>;
}

/// Login payload expected by `POST /Login`
#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "CompanyDB")]
    company_db: &'a str,
    #[serde(rename = "UserName")]
    username: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
}

/// `reqwest`-backed Service Layer session
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build an unauthenticated session with the OData paging headers set
    pub fn new(service: &ServiceConfig, pagination: &PaginationConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let prefer = HeaderValue::from_str(&format!(
            "odata.maxpagesize={}",
            pagination.page_size
        ))
        .map_err(|e| Error::config(e.to_string(), "pagination.page_size"))?;
        headers.insert("Prefer", prefer);
        headers.insert("OData-Version", HeaderValue::from_static("4.0"));
        headers.insert("OData-MaxVersion", HeaderValue::from_static("4.0"));
        headers.insert("B1S-CaseInsensitive", HeaderValue::from_static("true"));

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .danger_accept_invalid_certs(!service.verify_tls)
            .build()?;

        Ok(Self { client })
    }

    /// Build a session and log in with the configured credentials
    pub async fn connect(config: &Config) -> Result<Self> {
        let transport = Self::new(&config.service, &config.pagination)?;
        transport.login(&config.service).await?;
        Ok(transport)
    }

    /// `POST <base>/Login`; the session cookie is kept by the client
    pub async fn login(&self, service: &ServiceConfig) -> Result<()> {
        let url = service.base()?.join("Login")?;
        let payload = LoginRequest {
            company_db: &service.company_db,
            username: &service.username,
            password: &service.password,
        };

        tracing::debug!(url = %url, company = %service.company_db, "logging in");

        let response = self
            .client
            .post(url.clone())
            .json(&payload)
            .timeout(service.login_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "login rejected");
            return Err(Error::Login {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        tracing::info!(company = %service.company_db, "logged into Service Layer");
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse> {
        let mut request = self.client.get(url.clone()).timeout(timeout);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
