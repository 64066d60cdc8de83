//! # hookflow-adapter-http-reqwest
//!
//! Outbound HTTP adapter using [reqwest](https://docs.rs/reqwest).
//!
//! ## Responsibilities
//! - Implement the [`HttpClient`] port used by the webhook dispatcher
//! - Translate a [`DispatchRequest`] into a reqwest request (method, headers,
//!   content type, body, per-request timeout)
//! - Report every received response as is, whatever its status; only
//!   connection-level failures become errors
//!
//! ## Dependency rule
//! Depends on `hookflow-app` (for the port trait) and `hookflow-domain`.

use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use hookflow_app::ports::HttpClient;
use hookflow_domain::dispatch::{DispatchError, DispatchRequest, DispatchResponse};
use hookflow_domain::webhook::HttpMethod;

/// Errors raised while building the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unable to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Configuration for the outbound HTTP client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Time allowed to establish a connection; the overall per-request
    /// timeout comes from each webhook.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("hookflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Build a [`ReqwestHttpClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] if the TLS backend cannot be initialized.
    pub fn build(self) -> Result<ReqwestHttpClient, ClientError> {
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent)
            .build()?;
        Ok(ReqwestHttpClient { client })
    }
}

/// [`HttpClient`] backed by a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn classify(err: &reqwest::Error, timeout: Duration) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Timeout(timeout)
    } else {
        DispatchError::Network(err.to_string())
    }
}

impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let timeout = request.timeout;
        let mut builder = self
            .client
            .request(method(request.method), &request.url)
            .timeout(timeout);

        let explicit_content_type = request.headers.get(CONTENT_TYPE.as_str()).is_some();
        for header in request.headers.iter() {
            builder = builder.header(header.key.as_str(), header.value.as_str());
        }
        if let Some(body) = request.body {
            if !explicit_content_type {
                builder = builder.header(CONTENT_TYPE, request.content_type);
            }
            builder = builder.body(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|err| classify(&err, timeout))?;
        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(|err| classify(&err, timeout))?;
        let latency = started.elapsed();

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status_code,
            latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "webhook request sent"
        );

        Ok(DispatchResponse {
            status_code,
            body,
            latency,
        })
    }
}
