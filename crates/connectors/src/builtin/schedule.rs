//! Fixed-interval schedule trigger.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{ConnectorError, TriggerCheckResult, TriggerConnector, TriggerParams, Variable};

/// Fires every time the engine decides it is due.
///
/// All throttling happens in the engine; this connector only stamps the
/// firing time. The snapshot is passed through untouched.
pub struct IntervalTrigger {
    params: TriggerParams,
}

impl IntervalTrigger {
    pub fn new(params: TriggerParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl TriggerConnector for IntervalTrigger {
    fn step_id(&self) -> Uuid {
        self.params.step_id
    }

    async fn check(&self) -> Result<TriggerCheckResult, ConnectorError> {
        let variables = vec![
            Variable::new("FiredAt", Utc::now().to_rfc3339()),
            Variable::new("IntervalSeconds", self.params.polling_interval.as_secs()),
        ];
        Ok(TriggerCheckResult::fired(
            variables,
            self.params.last_comparison_data.clone(),
        ))
    }
}
