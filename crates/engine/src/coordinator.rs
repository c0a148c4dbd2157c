//! One pass of one automation.
//!
//! `ZapCoordinator` is the central orchestrator:
//! 1. Evaluates the automation's trigger; a failed or skipped evaluation
//!    ends the pass with nothing written.
//! 2. Persists `last_run_at` and the trigger's new snapshot.
//! 3. Stops if the trigger did not fire.
//! 4. Seeds the pass's step data with the trigger's variables.
//! 5. Runs every action in ascending order. Each action reads the output
//!    of whichever earlier step it is wired to.
//! 6. Reports whether every action succeeded.
//!
//! An action failure does not stop the chain. A structural error (unknown
//! connector, missing source data) aborts the rest of the pass, but the
//! state written in step 2 stands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use connectors::{RunStatus, TriggerCheckResult, Variable};

use crate::action::{ActionExecutor, JobsData, StepOutcome};
use crate::config::EngineConfig;
use crate::models::Automation;
use crate::registry::ConnectorRegistry;
use crate::store::{access_token_for, AutomationStore};
use crate::trigger::{Evaluation, TriggerEvaluator};
use crate::EngineError;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The trigger was not due (or is push-only); nothing was written.
    NotDue,
    /// The trigger connector failed; nothing was written.
    TriggerFailed,
    /// The trigger was checked and did not fire.
    Idle,
    /// The trigger fired and the action chain ran to the end.
    Completed { actions_run: usize, failed_actions: usize },
}

impl PassOutcome {
    /// `true` when the chain ran and no action reported `FAILURE`.
    pub fn fully_done(&self) -> bool {
        matches!(self, Self::Completed { failed_actions: 0, .. })
    }
}

pub struct ZapCoordinator {
    store: Arc<dyn AutomationStore>,
    evaluator: TriggerEvaluator,
    executor: ActionExecutor,
}

impl ZapCoordinator {
    pub fn new(
        store: Arc<dyn AutomationStore>,
        registry: Arc<ConnectorRegistry>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            evaluator: TriggerEvaluator::new(Arc::clone(&registry), config.call_timeout),
            executor: ActionExecutor::new(registry, Arc::clone(&store), config.call_timeout),
            store,
        }
    }

    /// Run one pass of `automation` now.
    pub async fn run_pass(&self, automation: &Automation) -> Result<PassOutcome, EngineError> {
        self.run_pass_at(automation, Utc::now()).await
    }

    /// Run one pass of `automation` as of `now`.
    #[instrument(skip_all, fields(automation_id = %automation.id))]
    pub async fn run_pass_at(
        &self,
        automation: &Automation,
        now: DateTime<Utc>,
    ) -> Result<PassOutcome, EngineError> {
        let trigger_step = self.store.get_trigger_step(automation.id).await?;
        let access_token = access_token_for(self.store.as_ref(), &trigger_step).await?;

        let evaluation = self
            .evaluator
            .evaluate(automation, &trigger_step, access_token, now)
            .await?;

        match evaluation {
            Evaluation::Skipped(_) => Ok(PassOutcome::NotDue),
            Evaluation::Checked(result) if result.status == RunStatus::Failure => {
                Ok(PassOutcome::TriggerFailed)
            }
            Evaluation::Checked(result) => {
                self.persist_and_run(automation, trigger_step.id, result, now).await
            }
        }
    }

    /// Run the action chain for a push delivery that the ingress layer has
    /// already authenticated and matched to `trigger_step_id`.
    ///
    /// The automation's stored snapshot is kept as is.
    #[instrument(skip_all, fields(automation_id = %automation.id, %trigger_step_id))]
    pub async fn run_webhook_actions(
        &self,
        automation: &Automation,
        trigger_step_id: Uuid,
        variables: Vec<Variable>,
    ) -> Result<PassOutcome, EngineError> {
        let result = TriggerCheckResult::fired(variables, automation.last_trigger_data.clone());
        self.persist_and_run(automation, trigger_step_id, result, Utc::now())
            .await
    }

    async fn persist_and_run(
        &self,
        automation: &Automation,
        trigger_step_id: Uuid,
        result: TriggerCheckResult,
        now: DateTime<Utc>,
    ) -> Result<PassOutcome, EngineError> {
        self.store
            .update_automation(automation.id, now, result.comparison_data.clone())
            .await?;

        if !result.is_triggered {
            debug!("trigger checked, nothing new");
            return Ok(PassOutcome::Idle);
        }

        info!(variables = result.variables.len(), "trigger fired");

        let mut jobs = JobsData::new();
        jobs.insert(
            trigger_step_id,
            StepOutcome {
                status: RunStatus::Success,
                variables: result.variables,
            },
        );

        let actions = self.store.list_action_steps(automation.id).await?;
        let mut failed_actions = 0;

        for step in &actions {
            let outcome = self.executor.execute(step, &jobs).await?;
            if outcome.status == RunStatus::Failure {
                failed_actions += 1;
            }
            jobs.insert(step.id, StepOutcome::from(outcome));
        }

        let outcome = PassOutcome::Completed {
            actions_run: actions.len(),
            failed_actions,
        };

        if outcome.fully_done() {
            info!(actions = actions.len(), "pass fully done");
        } else {
            warn!(actions = actions.len(), failed_actions, "pass finished with failed actions");
        }

        Ok(outcome)
    }
}
