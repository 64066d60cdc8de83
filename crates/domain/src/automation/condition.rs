//! Condition: a versioned guard evaluated before a step is dispatched.
//!
//! Steps store their condition as raw JSON; it is parsed here at evaluation
//! time so that records written with an older or broken schema never stop an
//! execution from loading.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{Context, value_to_text};
use crate::error::ValidationError;

/// The only schema version understood by this build.
pub const CONDITION_SCHEMA_VERSION: u32 = 1;

/// A parsed `{"version": 1, "rule": …}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub version: u32,
    pub rule: Rule,
}

/// A predicate over the flattened execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Rule {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    /// Substring match on text, membership on arrays.
    Contains { field: String, value: Value },
    GreaterThan { field: String, value: Value },
    LessThan { field: String, value: Value },
    /// The field is present and not `null`.
    Exists { field: String },
    All { rules: Vec<Rule> },
    Any { rules: Vec<Rule> },
    Not { rule: Box<Rule> },
}

/// Why a condition could not be decided.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("field `{0}` is not present in the execution context")]
    MissingField(String),

    #[error("field `{0}` cannot be compared numerically")]
    NotNumeric(String),
}

impl ConditionConfig {
    /// Parse a stored condition document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedConditionVersion`] for any version
    /// other than [`CONDITION_SCHEMA_VERSION`] and
    /// [`ValidationError::MalformedCondition`] when the document does not match
    /// the schema.
    pub fn parse(raw: &Value) -> Result<Self, ValidationError> {
        let version = raw
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| ValidationError::MalformedCondition("missing `version`".into()))?;
        let version = u32::try_from(version)
            .map_err(|_| ValidationError::UnsupportedConditionVersion(u32::MAX))?;
        if version != CONDITION_SCHEMA_VERSION {
            return Err(ValidationError::UnsupportedConditionVersion(version));
        }
        serde_json::from_value(raw.clone())
            .map_err(|err| ValidationError::MalformedCondition(err.to_string()))
    }

    /// Evaluate the rule against `ctx`.
    ///
    /// # Errors
    ///
    /// See [`Rule::evaluate`].
    pub fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        self.rule.evaluate(ctx)
    }
}

/// Parse and evaluate a raw condition document in one go.
///
/// # Errors
///
/// Returns a [`ConditionError`] when the document is invalid or a referenced
/// field cannot be resolved.
pub fn evaluate_raw(raw: &Value, ctx: &Context) -> Result<bool, ConditionError> {
    ConditionConfig::parse(raw)?.evaluate(ctx)
}

impl Rule {
    /// Decide the rule.
    ///
    /// `all` and `any` short-circuit in order. An unresolvable operand is an
    /// error, never a silent `false`, so `not` cannot flip it into `true`.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::MissingField`] when a comparison references
    /// an absent field and [`ConditionError::NotNumeric`] when an ordering
    /// comparison involves a non-number.
    pub fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        match self {
            Self::Equals { field, value } => Ok(loosely_equal(lookup(ctx, field)?, value)),
            Self::NotEquals { field, value } => Ok(!loosely_equal(lookup(ctx, field)?, value)),
            Self::Contains { field, value } => Ok(match lookup(ctx, field)? {
                Value::Array(items) => items.iter().any(|item| loosely_equal(item, value)),
                other => value_to_text(other).contains(&value_to_text(value)),
            }),
            Self::GreaterThan { field, value } => {
                let (lhs, rhs) = numeric_operands(ctx, field, value)?;
                Ok(lhs > rhs)
            }
            Self::LessThan { field, value } => {
                let (lhs, rhs) = numeric_operands(ctx, field, value)?;
                Ok(lhs < rhs)
            }
            Self::Exists { field } => Ok(ctx.get(field).is_some_and(|v| !v.is_null())),
            Self::All { rules } => {
                for rule in rules {
                    if !rule.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any { rules } => {
                for rule in rules {
                    if rule.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { rule } => Ok(!rule.evaluate(ctx)?),
        }
    }
}

fn lookup<'a>(ctx: &'a Context, field: &str) -> Result<&'a Value, ConditionError> {
    ctx.get(field)
        .ok_or_else(|| ConditionError::MissingField(field.to_string()))
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    actual == expected || value_to_text(actual) == value_to_text(expected)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numeric_operands(
    ctx: &Context,
    field: &str,
    value: &Value,
) -> Result<(f64, f64), ConditionError> {
    let lhs = as_number(lookup(ctx, field)?)
        .ok_or_else(|| ConditionError::NotNumeric(field.to_string()))?;
    let rhs = as_number(value).ok_or_else(|| ConditionError::NotNumeric(field.to_string()))?;
    Ok((lhs, rhs))
}
