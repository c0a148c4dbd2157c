//! Runs one action step against the variables of the step it is wired to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use connectors::{ActionParams, ActionRunResult, RunStatus, Variable};

use crate::boundary::guarded;
use crate::models::Step;
use crate::registry::ConnectorRegistry;
use crate::store::{access_token_for, AutomationStore};
use crate::EngineError;

/// What one step produced during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub status: RunStatus,
    pub variables: Vec<Variable>,
}

impl From<ActionRunResult> for StepOutcome {
    fn from(result: ActionRunResult) -> Self {
        Self {
            status: result.status,
            variables: result.variables,
        }
    }
}

/// Outcomes of every step that has run so far in a pass, keyed by step ID.
pub type JobsData = HashMap<Uuid, StepOutcome>;

pub struct ActionExecutor {
    registry: Arc<ConnectorRegistry>,
    store: Arc<dyn AutomationStore>,
    call_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        store: Arc<dyn AutomationStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            call_timeout,
        }
    }

    /// Run `step` with the variables its source step left in `jobs`.
    ///
    /// An unwired step, a connector error, a timeout or a panic all come
    /// back as `Ok` with `status: FAILURE`.
    ///
    /// # Errors
    /// - [`EngineError::MissingStepData`] if the source step has no entry in `jobs`.
    /// - [`EngineError::UnknownConnector`] if the step's connector is not registered.
    /// - [`EngineError::Database`] if the step's connection cannot be loaded.
    pub async fn execute(&self, step: &Step, jobs: &JobsData) -> Result<ActionRunResult, EngineError> {
        let Some(source_step_id) = step.source_step_id else {
            warn!(
                automation_id = %step.automation_id,
                step_id = %step.id,
                "action has no source step"
            );
            return Ok(ActionRunResult::failure());
        };

        let upstream = jobs
            .get(&source_step_id)
            .ok_or(EngineError::MissingStepData {
                automation_id: step.automation_id,
                step_id: step.id,
                source_step_id,
            })?;

        let access_token = access_token_for(self.store.as_ref(), step).await?;
        let connector = self.registry.build_action(
            &step.connector_id,
            ActionParams {
                step_id: step.id,
                access_token,
                payload: step.payload.clone(),
            },
        )?;

        match guarded(self.call_timeout, connector.execute(&upstream.variables)).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(
                    automation_id = %step.automation_id,
                    step_id = %step.id,
                    connector_id = %step.connector_id,
                    error = %e,
                    "action failed"
                );
                Ok(ActionRunResult::failure())
            }
        }
    }
}
