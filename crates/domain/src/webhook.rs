//! Webhook: a reusable HTTP call definition referenced by automation steps.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HookflowError, ValidationError};
use crate::id::WebhookId;
use crate::time::{Timestamp, now};

/// HTTP verb used when dispatching a webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Canonical upper-case representation, as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether a rendered payload is sent as the request body.
    #[must_use]
    pub fn carries_body(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ValidationError::UnknownValue {
                field: "method",
                value: s.to_string(),
            }),
        }
    }
}

/// How the payload template is interpreted before dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    /// A JSON document with `{{token}}` placeholders.
    #[default]
    Json,
    /// HTML destined for downstream PDF rendering.
    Pdf,
    /// A rule set selecting one of several sub-templates.
    Dynamic,
}

impl PayloadType {
    /// Stable storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
            Self::Dynamic => "dynamic",
        }
    }

    /// `Content-Type` header sent with a rendered payload of this type.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json | Self::Dynamic => "application/json",
            Self::Pdf => "text/html; charset=utf-8",
        }
    }
}

impl FromStr for PayloadType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(ValidationError::UnknownValue {
                field: "payload_type",
                value: other.to_string(),
            }),
        }
    }
}

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// Ordered request headers with case-insensitively unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Header>", into = "Vec<Header>")]
pub struct Headers(Vec<Header>);

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing value for the same key
    /// while keeping its original position.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyHeaderName`] when `key` is blank.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyHeaderName);
        }
        let value = value.into();
        match self.0.iter_mut().find(|h| h.key.eq_ignore_ascii_case(&key)) {
            Some(existing) => existing.value = value,
            None => self.0.push(Header { key, value }),
        }
        Ok(())
    }

    /// Look up a header value by case-insensitive key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(key))
            .map(|h| h.value.as_str())
    }

    /// Iterate headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<Header>> for Headers {
    type Error = ValidationError;

    fn try_from(value: Vec<Header>) -> Result<Self, Self::Error> {
        let mut headers = Self::new();
        for header in value {
            if headers.get(&header.key).is_some() {
                return Err(ValidationError::DuplicateHeader(header.key));
            }
            headers.insert(header.key, header.value)?;
        }
        Ok(headers)
    }
}

impl From<Headers> for Vec<Header> {
    fn from(value: Headers) -> Self {
        value.0
    }
}

/// A reusable HTTP call definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub payload_type: PayloadType,
    pub payload_template: String,
    pub retry_enabled: bool,
    pub retry_count: u32,
    pub retry_delay_seconds: u64,
    pub timeout_seconds: u64,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Webhook {
    /// Create a builder for constructing a [`Webhook`].
    #[must_use]
    pub fn builder() -> WebhookBuilder {
        WebhookBuilder::default()
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `url` is not an absolute http(s) url ([`ValidationError::InvalidUrl`])
    /// - `timeout_seconds` is zero ([`ValidationError::ZeroTimeout`])
    /// - a header name or value cannot be sent ([`ValidationError::InvalidHeader`])
    pub fn validate(&self) -> Result<(), HookflowError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if !is_http_url(&self.url) {
            return Err(ValidationError::InvalidUrl(self.url.clone()).into());
        }
        if self.timeout_seconds == 0 {
            return Err(ValidationError::ZeroTimeout.into());
        }
        for header in self.headers.iter() {
            if !is_sendable_header(header) {
                return Err(ValidationError::InvalidHeader(header.key.clone()).into());
            }
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| {
        matches!(parsed.scheme(), "http" | "https")
            && parsed.host_str().is_some_and(|host| !host.is_empty())
    })
}

fn is_sendable_header(header: &Header) -> bool {
    http::HeaderName::from_bytes(header.key.as_bytes()).is_ok()
        && http::HeaderValue::from_str(&header.value).is_ok()
}

/// Step-by-step builder for [`Webhook`].
#[derive(Debug, Default)]
pub struct WebhookBuilder {
    id: Option<WebhookId>,
    name: Option<String>,
    url: Option<String>,
    method: Option<HttpMethod>,
    headers: Headers,
    payload_type: Option<PayloadType>,
    payload_template: Option<String>,
    retry_enabled: Option<bool>,
    retry_count: Option<u32>,
    retry_delay_seconds: Option<u64>,
    timeout_seconds: Option<u64>,
    is_active: Option<bool>,
    created_at: Option<Timestamp>,
}

/// Default per-attempt timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

impl WebhookBuilder {
    #[must_use]
    pub fn id(mut self, id: WebhookId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn payload_type(mut self, payload_type: PayloadType) -> Self {
        self.payload_type = Some(payload_type);
        self
    }

    #[must_use]
    pub fn payload_template(mut self, template: impl Into<String>) -> Self {
        self.payload_template = Some(template.into());
        self
    }

    /// Enable retries with `count` extra attempts spaced `delay_seconds` apart.
    #[must_use]
    pub fn retry(mut self, count: u32, delay_seconds: u64) -> Self {
        self.retry_enabled = Some(true);
        self.retry_count = Some(count);
        self.retry_delay_seconds = Some(delay_seconds);
        self
    }

    #[must_use]
    pub fn retry_enabled(mut self, enabled: bool) -> Self {
        self.retry_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn is_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Webhook`].
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] if required fields are missing or invalid.
    pub fn build(self) -> Result<Webhook, HookflowError> {
        let created_at = self.created_at.unwrap_or_else(now);
        let webhook = Webhook {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            method: self.method.unwrap_or_default(),
            headers: self.headers,
            payload_type: self.payload_type.unwrap_or_default(),
            payload_template: self.payload_template.unwrap_or_default(),
            retry_enabled: self.retry_enabled.unwrap_or(false),
            retry_count: self.retry_count.unwrap_or(0),
            retry_delay_seconds: self.retry_delay_seconds.unwrap_or(0),
            timeout_seconds: self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            is_active: self.is_active.unwrap_or(true),
            created_at,
            updated_at: created_at,
        };
        webhook.validate()?;
        Ok(webhook)
    }
}
