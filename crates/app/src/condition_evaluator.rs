//! Fail-closed evaluation of step conditions.

use serde_json::Value;

use hookflow_domain::automation::evaluate_raw;
use hookflow_domain::context::Context;

/// Decides whether a conditional step runs.
///
/// Anything that cannot be decided (no condition stored, unknown schema
/// version, malformed rule, absent field) counts as `false` and is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn evaluate(&self, condition: Option<&Value>, ctx: &Context) -> bool {
        let Some(raw) = condition else {
            tracing::warn!("conditional step has no condition, skipping");
            return false;
        };
        match evaluate_raw(raw, ctx) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "condition could not be evaluated, skipping");
                false
            }
        }
    }
}
