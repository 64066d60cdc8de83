//! Dispatch types: the outbound request built for a webhook and what came back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::webhook::{Headers, HttpMethod, Webhook};

/// A fully rendered HTTP request, ready for an `HttpClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    /// `None` for methods that do not carry a body.
    pub body: Option<String>,
    pub content_type: &'static str,
    pub timeout: Duration,
}

impl DispatchRequest {
    /// Build the request for `webhook` carrying the rendered `payload`.
    #[must_use]
    pub fn for_webhook(webhook: &Webhook, payload: String) -> Self {
        Self {
            method: webhook.method,
            url: webhook.url.clone(),
            headers: webhook.headers.clone(),
            body: webhook.method.carries_body().then_some(payload),
            content_type: webhook.payload_type.content_type(),
            timeout: webhook.timeout(),
        }
    }
}

/// A response received within the timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub status_code: u16,
    pub body: String,
    pub latency: Duration,
}

impl DispatchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// A single attempt that did not produce a 2xx response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("http status {status_code}")]
    Http { status_code: u16, body: String },
}

impl DispatchError {
    /// Short machine-friendly label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => Some(*status_code),
            Self::Timeout(_) | Self::Network(_) => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => Some(body),
            Self::Timeout(_) | Self::Network(_) => None,
        }
    }
}

/// Why a step's dispatch ultimately failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchFailure {
    /// Never sent: the webhook cannot be used.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Sent (possibly several times) and the last attempt failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Stopped while waiting between attempts.
    #[error("cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::PayloadType;

    fn webhook(method: HttpMethod) -> Webhook {
        Webhook::builder()
            .name("crm")
            .url("https://crm.example.com/leads")
            .method(method)
            .payload_type(PayloadType::Pdf)
            .timeout_seconds(5)
            .build()
            .unwrap()
    }

    #[test]
    fn should_carry_payload_and_content_type_for_post() {
        let req = DispatchRequest::for_webhook(&webhook(HttpMethod::Post), "<p/>".into());
        assert_eq!(req.body.as_deref(), Some("<p/>"));
        assert_eq!(req.content_type, "text/html; charset=utf-8");
        assert_eq!(req.timeout, Duration::from_secs(5));
    }

    #[test]
    fn should_drop_body_for_get() {
        let req = DispatchRequest::for_webhook(&webhook(HttpMethod::Get), "{}".into());
        assert!(req.body.is_none());
    }

    #[test]
    fn should_treat_only_2xx_as_success() {
        let resp = |status_code| DispatchResponse {
            status_code,
            body: String::new(),
            latency: Duration::ZERO,
        };
        assert!(resp(200).is_success());
        assert!(resp(204).is_success());
        assert!(!resp(301).is_success());
        assert!(!resp(500).is_success());
    }

    #[test]
    fn should_expose_status_and_body_of_http_errors() {
        let err = DispatchError::Http {
            status_code: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.kind(), "http");
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.body(), Some("bad gateway"));
        assert_eq!(err.to_string(), "http status 502");
    }

    #[test]
    fn should_format_timeout_in_seconds() {
        assert_eq!(
            DispatchError::Timeout(Duration::from_secs(30)).to_string(),
            "timed out after 30s"
        );
    }
}
