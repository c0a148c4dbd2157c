//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::StepRole;

/// Errors produced by the automation engine (validation + execution).
///
/// Connector failures never show up here: they are downgraded to a
/// `FAILURE` status at the call boundary. Everything below is structural
/// and aborts the current automation pass.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------
    /// Two or more steps share the same ID.
    #[error("duplicate step ID: '{0}'")]
    DuplicateStepId(Uuid),

    /// An automation must have exactly one trigger step.
    #[error("automation {automation_id} has {found} trigger steps, expected exactly one")]
    TriggerCount { automation_id: Uuid, found: usize },

    /// The trigger step is not at order 0.
    #[error("trigger step {step_id} has order {order}, expected 0")]
    TriggerOrder { step_id: Uuid, order: i32 },

    /// An action step is at order 0 or below.
    #[error("action step {step_id} has order {order}, expected >= 1")]
    ActionOrder { step_id: Uuid, order: i32 },

    /// Two action steps share an order.
    #[error("more than one step at order {order}")]
    DuplicateOrder { order: i32 },

    /// An action is wired to a step that is not part of the automation.
    #[error("step {step_id} reads from unknown step {source_step_id}")]
    UnknownSourceStep { step_id: Uuid, source_step_id: Uuid },

    /// An action is wired to a step that runs after it.
    #[error("step {step_id} reads from step {source_step_id}, which runs later")]
    ForwardSourceReference { step_id: Uuid, source_step_id: Uuid },

    // ------ Execution errors ------
    /// No connector is registered under this ID for the step's role.
    #[error("unknown {role} connector '{connector_id}'")]
    UnknownConnector { connector_id: String, role: StepRole },

    /// An action's source step produced no data during this pass.
    #[error(
        "missing step data: automation {automation_id}, step {step_id} reads from \
         {source_step_id}, which has not run in this pass"
    )]
    MissingStepData {
        automation_id: Uuid,
        step_id: Uuid,
        source_step_id: Uuid,
    },

    /// The external service refused, or could not be asked for, a push
    /// callback registration.
    #[error("webhook registration for step {step_id} failed: {message}")]
    WebhookRegistration { step_id: Uuid, message: String },

    /// An environment variable held an unusable value.
    #[error("invalid configuration {key}={value:?}")]
    InvalidConfig { key: &'static str, value: String },

    /// Persistence error from the store.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
