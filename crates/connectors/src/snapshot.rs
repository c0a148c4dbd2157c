//! The snapshot-diff protocol polling triggers follow.
//!
//! A polling connector lists the items it watches (files, rows, messages…)
//! and hands them to [`detect_new`] together with the comparison data it
//! was constructed with. The stored snapshot is `{"known": [key, …]}`.
//!
//! - No snapshot yet: record every current key, never fire.
//! - Nothing unseen: keep the snapshot, don't fire.
//! - Something unseen: fire for the *first* unseen item in upstream order
//!   and add only its key. The rest is reported on later checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConnectorError, TriggerCheckResult, Variable};

/// Stored form of the set of items a trigger has already seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub known: Vec<String>,
}

impl Snapshot {
    pub fn from_comparison_data(data: &Value) -> Result<Self, ConnectorError> {
        serde_json::from_value(data.clone())
            .map_err(|e| ConnectorError::InvalidComparisonData(e.to_string()))
    }

    pub fn to_comparison_data(&self) -> Value {
        serde_json::json!({ "known": self.known })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.known.iter().any(|k| k == key)
    }
}

/// Diff `items` against the stored snapshot.
///
/// `key_of` gives each item its stable identity; `to_variables` renders
/// the item that fires.
///
/// # Errors
/// [`ConnectorError::InvalidComparisonData`] if the stored snapshot is not
/// in the `{"known": [...]}` shape.
pub fn detect_new<T>(
    items: &[T],
    key_of: impl Fn(&T) -> String,
    last_comparison_data: Option<&Value>,
    to_variables: impl Fn(&T) -> Vec<Variable>,
) -> Result<TriggerCheckResult, ConnectorError> {
    let Some(previous) = last_comparison_data.filter(|v| !v.is_null()) else {
        let baseline = Snapshot {
            known: items.iter().map(&key_of).collect(),
        };
        return Ok(TriggerCheckResult::idle(Some(baseline.to_comparison_data())));
    };

    let mut snapshot = Snapshot::from_comparison_data(previous)?;

    match items.iter().find(|item| !snapshot.contains(&key_of(item))) {
        None => Ok(TriggerCheckResult::idle(Some(previous.clone()))),
        Some(item) => {
            snapshot.known.push(key_of(item));
            Ok(TriggerCheckResult::fired(
                to_variables(item),
                Some(snapshot.to_comparison_data()),
            ))
        }
    }
}
