//! The scheduler loop. Drives a pass of every active automation, over and
//! over, one at a time.
//!
//! Each cycle reads a fresh automation list from the store. Failures are
//! contained per automation: an error is logged with the automation ID and
//! the loop moves on to the next one. Throttling lives in the trigger
//! evaluator, so by default a new cycle starts as soon as the last ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use connectors::Variable;

use crate::config::EngineConfig;
use crate::coordinator::{PassOutcome, ZapCoordinator};
use crate::models::{Automation, AutomationDefinition};
use crate::registry::ConnectorRegistry;
use crate::store::AutomationStore;
use crate::validate::validate_automation;
use crate::EngineError;

/// Pause after a cycle that could not list automations.
const LIST_FAILURE_BACKOFF: Duration = Duration::from_secs(1);

/// Counters for one scheduler cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub visited: usize,
    pub inactive: usize,
    pub fired: usize,
    pub errored: usize,
}

pub struct SchedulerLoop {
    store: Arc<dyn AutomationStore>,
    registry: Arc<ConnectorRegistry>,
    coordinator: ZapCoordinator,
    config: EngineConfig,
}

impl SchedulerLoop {
    pub fn new(
        store: Arc<dyn AutomationStore>,
        registry: Arc<ConnectorRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            coordinator: ZapCoordinator::new(Arc::clone(&store), Arc::clone(&registry), &config),
            store,
            registry,
            config,
        }
    }

    pub fn coordinator(&self) -> &ZapCoordinator {
        &self.coordinator
    }

    /// Validate every active automation, logging each one that is invalid.
    ///
    /// Returns how many failed validation. Invalid automations are still
    /// visited by the loop; their passes fail individually.
    pub async fn preflight(&self) -> Result<usize, EngineError> {
        let automations = self.store.list_active_automations().await?;
        let mut invalid = 0;

        for automation in automations {
            let id = automation.id;
            if let Err(e) = self.validate_stored(automation).await {
                invalid += 1;
                error!(automation_id = %id, error = %e, "automation failed validation");
            }
        }

        info!(invalid, "preflight complete");
        Ok(invalid)
    }

    async fn validate_stored(&self, automation: Automation) -> Result<(), EngineError> {
        let trigger = self.store.get_trigger_step(automation.id).await?;
        let mut steps = vec![trigger];
        steps.extend(self.store.list_action_steps(automation.id).await?);

        validate_automation(
            &AutomationDefinition {
                automation,
                steps,
                connections: Vec::new(),
            },
            &self.registry,
        )
        .map(|_| ())
    }

    /// Run one pass of every active automation, sequentially.
    ///
    /// # Errors
    /// Only if the automation list itself cannot be read.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleSummary, EngineError> {
        let automations = self.store.list_active_automations().await?;
        let mut summary = CycleSummary::default();

        for automation in &automations {
            if !automation.is_active {
                summary.inactive += 1;
                continue;
            }
            summary.visited += 1;

            match self.coordinator.run_pass(automation).await {
                Ok(PassOutcome::Completed { .. }) => summary.fired += 1,
                Ok(outcome) => debug!(automation_id = %automation.id, ?outcome, "pass ended"),
                Err(e) => {
                    summary.errored += 1;
                    error!(
                        automation_id = %automation.id,
                        name = %automation.name,
                        error = %e,
                        "automation pass aborted"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Run cycles until `shutdown` fires or its sender is dropped.
    ///
    /// Shutdown is observed between cycles and while waiting out the cycle
    /// delay, so a pass in progress always runs to completion.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(cycle_delay = ?self.config.cycle_delay, "scheduler started");

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Closed) | Err(TryRecvError::Lagged(_)) => break,
            }

            let pause = match self.run_cycle().await {
                Ok(_) => self.config.cycle_delay,
                Err(e) => {
                    warn!(error = %e, "could not list automations");
                    self.config.cycle_delay.max(LIST_FAILURE_BACKOFF)
                }
            };

            if pause.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                // A signal, a dropped sender or a lag all mean stop.
                _ = shutdown.recv() => break,
            }
        }

        info!("scheduler stopped");
    }

    /// Push entry point for webhook deliveries. See
    /// [`ZapCoordinator::run_webhook_actions`].
    pub async fn run_webhook_actions(
        &self,
        automation: &Automation,
        trigger_step_id: Uuid,
        variables: Vec<Variable>,
    ) -> Result<PassOutcome, EngineError> {
        self.coordinator
            .run_webhook_actions(automation, trigger_step_id, variables)
            .await
    }
}
