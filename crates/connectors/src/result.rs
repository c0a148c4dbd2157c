//! Values exchanged between connectors and the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome status shared by trigger checks and action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failure,
}

/// A scalar variable value. Variables never nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl VariableValue {
    /// Convert a JSON value, returning `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for VariableValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for VariableValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for VariableValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// A flat key/value datum produced by one step and consumed by a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: VariableValue,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TriggerCheckResult
// ---------------------------------------------------------------------------

/// What a trigger check reports back to the engine.
///
/// `status == Failure` always implies `is_triggered == false` and an
/// unchanged `comparison_data`; use [`TriggerCheckResult::failure`] to
/// build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCheckResult {
    pub status: RunStatus,
    pub is_triggered: bool,
    pub variables: Vec<Variable>,
    /// Opaque, connector-defined snapshot persisted between checks.
    pub comparison_data: Option<Value>,
}

impl TriggerCheckResult {
    /// A failed check that leaves the previous snapshot untouched.
    pub fn failure(previous: Option<Value>) -> Self {
        Self {
            status: RunStatus::Failure,
            is_triggered: false,
            variables: Vec::new(),
            comparison_data: previous,
        }
    }

    /// A successful check that found nothing new.
    pub fn idle(comparison_data: Option<Value>) -> Self {
        Self {
            status: RunStatus::Success,
            is_triggered: false,
            variables: Vec::new(),
            comparison_data,
        }
    }

    /// A successful check that fired with `variables`.
    pub fn fired(variables: Vec<Variable>, comparison_data: Option<Value>) -> Self {
        Self {
            status: RunStatus::Success,
            is_triggered: true,
            variables,
            comparison_data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

// ---------------------------------------------------------------------------
// ActionRunResult
// ---------------------------------------------------------------------------

/// What an action execution reports back to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRunResult {
    pub status: RunStatus,
    pub variables: Vec<Variable>,
}

impl ActionRunResult {
    pub fn success(variables: Vec<Variable>) -> Self {
        Self {
            status: RunStatus::Success,
            variables,
        }
    }

    pub fn failure() -> Self {
        Self {
            status: RunStatus::Failure,
            variables: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_keeps_previous_snapshot() {
        let previous = json!({ "known": ["a"] });
        let result = TriggerCheckResult::failure(Some(previous.clone()));
        assert_eq!(result.status, RunStatus::Failure);
        assert!(!result.is_triggered);
        assert!(result.variables.is_empty());
        assert_eq!(result.comparison_data, Some(previous));
    }

    #[test]
    fn nested_json_is_not_a_variable_value() {
        assert_eq!(VariableValue::from_json(&json!({ "a": 1 })), None);
        assert_eq!(VariableValue::from_json(&json!([1, 2])), None);
        assert_eq!(VariableValue::from_json(&json!(null)), Some(VariableValue::Null));
    }

    #[test]
    fn variables_serialise_flat() {
        let var = Variable::new("FileName", "f3");
        assert_eq!(
            serde_json::to_value(&var).unwrap(),
            json!({ "key": "FileName", "value": "f3" })
        );
        let status = serde_json::to_value(RunStatus::Failure).unwrap();
        assert_eq!(status, json!("FAILURE"));
    }
}
