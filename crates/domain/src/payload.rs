//! Payload templates: `{{token}}` substitution and dynamic sub-template selection.
//!
//! Rendering is lenient: tokens that do not resolve against the [`Context`]
//! render as the empty string.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::context::{Context, value_to_text};
use crate::error::ValidationError;
use crate::webhook::PayloadType;

/// `{{ name }}`, inner whitespace allowed. A constant pattern, compiled once.
const TOKEN_PATTERN: &str = r"\{\{\s*([^{}\s]+)\s*\}\}";

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("TOKEN_PATTERN is a valid regex"));

fn token_regex() -> &'static Regex {
    &TOKEN_REGEX
}

/// Distinct token names in order of first appearance.
#[must_use]
pub fn discover_tokens(template: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for caps in token_regex().captures_iter(template) {
        let name = &caps[1];
        if !tokens.iter().any(|t| t == name) {
            tokens.push(name.to_string());
        }
    }
    tokens
}

/// Replace every `{{token}}` with its context value (empty when unresolved).
#[must_use]
pub fn substitute(template: &str, ctx: &Context) -> String {
    token_regex()
        .replace_all(template, |caps: &regex::Captures| {
            ctx.get_text(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// A rule-based template: the first matching rule's template wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicTemplate {
    #[serde(default)]
    pub rules: Vec<DynamicRule>,
    #[serde(default)]
    pub default: Option<String>,
}

/// One candidate sub-template guarded by equality checks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicRule {
    /// Context key → expected value; every entry must match.
    #[serde(default)]
    pub when: serde_json::Map<String, Value>,
    pub template: String,
}

impl DynamicRule {
    fn matches(&self, ctx: &Context) -> bool {
        self.when.iter().all(|(field, expected)| {
            ctx.get(field).is_some_and(|actual| {
                actual == expected || value_to_text(actual) == value_to_text(expected)
            })
        })
    }
}

impl DynamicTemplate {
    /// Parse a dynamic template definition.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedTemplate`] when `raw` is not a valid definition.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(raw).map_err(|err| ValidationError::MalformedTemplate(err.to_string()))
    }

    /// The sub-template selected for `ctx`, if any.
    #[must_use]
    pub fn select(&self, ctx: &Context) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(ctx))
            .map(|rule| rule.template.as_str())
            .or(self.default.as_deref())
    }
}

/// Render a webhook payload.
///
/// `json` and `pdf` templates are substituted directly (a `pdf` template is
/// HTML handed to a downstream renderer). `dynamic` templates first select a
/// sub-template; when nothing matches and there is no default the payload is
/// empty.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedTemplate`] for an unparseable dynamic template.
pub fn render(
    template: &str,
    payload_type: PayloadType,
    ctx: &Context,
) -> Result<String, ValidationError> {
    match payload_type {
        PayloadType::Json | PayloadType::Pdf => Ok(substitute(template, ctx)),
        PayloadType::Dynamic => {
            let dynamic = DynamicTemplate::parse(template)?;
            Ok(dynamic
                .select(ctx)
                .map(|selected| substitute(selected, ctx))
                .unwrap_or_default())
        }
    }
}
