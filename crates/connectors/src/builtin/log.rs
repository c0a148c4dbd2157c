//! Action that writes its input to the log and passes it on.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use crate::flatten::to_variables;
use crate::{ActionConnector, ActionParams, ActionRunResult, ConnectorError, Variable};

/// Logs the upstream variables.
///
/// With a `rename` object in the payload the output is the upstream
/// variables relabelled through it; otherwise the input is echoed back.
pub struct LogAction {
    params: ActionParams,
}

impl LogAction {
    pub fn new(params: ActionParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ActionConnector for LogAction {
    async fn execute(&self, upstream: &[Variable]) -> Result<ActionRunResult, ConnectorError> {
        let mut as_object = Map::new();
        for var in upstream {
            let value = serde_json::to_value(&var.value)
                .map_err(|e| ConnectorError::InvalidPayload(e.to_string()))?;
            as_object.insert(var.key.clone(), value);
        }
        let as_object = Value::Object(as_object);

        info!(step_id = %self.params.step_id, variables = %as_object, "log action");

        let variables = match self.params.payload.get("rename") {
            Some(names @ Value::Object(_)) => to_variables(&as_object, names),
            Some(other) => {
                return Err(ConnectorError::InvalidPayload(format!(
                    "'rename' must be an object, got {other}"
                )))
            }
            None => upstream.to_vec(),
        };

        Ok(ActionRunResult::success(variables))
    }
}
