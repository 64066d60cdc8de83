//! Execution context: the flattened view of trigger data and prior step
//! results that conditions and payload templates are evaluated against.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::execution::StepStatus;

/// Trigger payload captured when an execution starts.
pub type TriggerData = serde_json::Map<String, Value>;

/// Flattened key → value map.
///
/// Nested objects and arrays are addressed with dotted paths
/// (`customer.email`, `items.0.sku`); every intermediate node is also
/// present, so `customer` resolves to the whole object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from the trigger data of an execution.
    #[must_use]
    pub fn from_trigger(data: &TriggerData) -> Self {
        let mut ctx = Self::new();
        for (key, value) in data {
            ctx.insert_flattened(key.clone(), value);
        }
        ctx
    }

    /// Insert `value` at `path` together with all of its descendants.
    pub fn insert_flattened(&mut self, path: String, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.insert_flattened(format!("{path}.{key}"), child);
                }
            }
            Value::Array(items) => {
                for (idx, child) in items.iter().enumerate() {
                    self.insert_flattened(format!("{path}.{idx}"), child);
                }
            }
            _ => {}
        }
        self.values.insert(path, value.clone());
    }

    /// Expose a finished step to later steps under `steps.<order>.*`.
    ///
    /// A JSON response body is flattened below `steps.<order>.response`;
    /// any other body is kept as a plain string.
    pub fn insert_step_result(
        &mut self,
        step_order: u32,
        status: StepStatus,
        status_code: Option<u16>,
        response_body: Option<&str>,
    ) {
        let prefix = format!("steps.{step_order}");
        self.values.insert(
            format!("{prefix}.status"),
            Value::String(status.as_str().to_string()),
        );
        if let Some(code) = status_code {
            self.values
                .insert(format!("{prefix}.status_code"), Value::from(code));
        }
        if let Some(body) = response_body {
            let key = format!("{prefix}.response");
            match serde_json::from_str::<Value>(body) {
                Ok(json @ (Value::Object(_) | Value::Array(_))) => {
                    self.insert_flattened(key, &json);
                }
                _ => {
                    self.values.insert(key, Value::String(body.to_string()));
                }
            }
        }
    }

    /// Raw value at `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value at `key` rendered as text (strings unquoted, everything else as JSON).
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.values.get(key).map(value_to_text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Render a JSON value for textual substitution.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
