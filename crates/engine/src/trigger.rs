//! Trigger evaluation: decides whether a trigger connector is consulted
//! on this pass and normalises what it reports.
//!
//! Webhook triggers are never polled. Schedule and polling triggers are
//! checked immediately on cold start (no previous run), and afterwards
//! only once strictly more than their interval has elapsed since the last
//! successful evaluation. Anything else yields the *skip* result, which
//! carries `status: FAILURE` and the unchanged snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use connectors::{RunStatus, TriggerCheckResult, TriggerParams};

use crate::boundary::guarded;
use crate::models::{Automation, Step};
use crate::registry::ConnectorRegistry;
use crate::EngineError;

/// Whether the connector was actually consulted.
///
/// Both variants carry a [`TriggerCheckResult`]; a skip looks exactly like
/// a connector failure from the result alone.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Not due (or push-only): the connector was not called.
    Skipped(TriggerCheckResult),
    /// The connector was called; the result may still be a failure.
    Checked(TriggerCheckResult),
}

impl Evaluation {
    pub fn result(&self) -> &TriggerCheckResult {
        match self {
            Self::Skipped(r) | Self::Checked(r) => r,
        }
    }

    pub fn into_result(self) -> TriggerCheckResult {
        match self {
            Self::Skipped(r) | Self::Checked(r) => r,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// `true` if a trigger last evaluated at `last_run_at` may be checked at `now`.
pub fn is_due(last_run_at: Option<DateTime<Utc>>, interval: Duration, now: DateTime<Utc>) -> bool {
    match last_run_at {
        None => true,
        // A negative elapsed time (clock moved backwards) is never due.
        Some(last) => (now - last).to_std().map_or(false, |elapsed| elapsed > interval),
    }
}

pub struct TriggerEvaluator {
    registry: Arc<ConnectorRegistry>,
    call_timeout: Duration,
}

impl TriggerEvaluator {
    pub fn new(registry: Arc<ConnectorRegistry>, call_timeout: Duration) -> Self {
        Self {
            registry,
            call_timeout,
        }
    }

    /// Evaluate `step`, the trigger of `automation`, as of `now`.
    ///
    /// # Errors
    /// [`EngineError::UnknownConnector`] if the step's connector is not
    /// registered. Connector failures are not errors.
    pub async fn evaluate(
        &self,
        automation: &Automation,
        step: &Step,
        access_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, EngineError> {
        let registration = self.registry.trigger(&step.connector_id)?;
        let previous = automation.last_trigger_data.clone();

        if !registration.kind.is_polled() {
            debug!(automation_id = %automation.id, step_id = %step.id, "webhook trigger, not polled");
            return Ok(Evaluation::Skipped(TriggerCheckResult::failure(previous)));
        }

        let interval = registration.interval_for(&step.payload);
        if !is_due(automation.last_run_at, interval, now) {
            debug!(
                automation_id = %automation.id,
                step_id = %step.id,
                ?interval,
                "trigger not due"
            );
            return Ok(Evaluation::Skipped(TriggerCheckResult::failure(previous)));
        }

        let connector = registration.build(TriggerParams {
            step_id: step.id,
            kind: registration.kind,
            last_execution_time: automation.last_run_at,
            last_comparison_data: previous.clone(),
            polling_interval: interval,
            access_token,
            payload: step.payload.clone(),
        });

        let result = match guarded(self.call_timeout, connector.check()).await {
            Ok(result) if result.status == RunStatus::Failure => {
                warn!(
                    automation_id = %automation.id,
                    step_id = %step.id,
                    connector_id = %step.connector_id,
                    "trigger reported failure"
                );
                TriggerCheckResult::failure(previous)
            }
            Ok(result) => result,
            Err(e) => {
                warn!(
                    automation_id = %automation.id,
                    step_id = %step.id,
                    connector_id = %step.connector_id,
                    error = %e,
                    "trigger check failed"
                );
                TriggerCheckResult::failure(previous)
            }
        };

        Ok(Evaluation::Checked(result))
    }
}
