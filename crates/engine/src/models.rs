//! Core domain models for the automation engine.
//!
//! An [`Automation`] is one trigger [`Step`] (order 0) followed by an
//! ordered chain of action steps. The engine only ever writes
//! `last_run_at` and `last_trigger_data`; everything else is owned by the
//! management layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Automation
// ---------------------------------------------------------------------------

/// A trigger plus an ordered chain of actions ("Zap").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Opaque snapshot owned by the trigger connector.
    pub last_trigger_data: Option<Value>,
}

impl Automation {
    /// Convenience constructor for a fresh, active automation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_active: true,
            last_run_at: None,
            last_trigger_data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// Whether a step observes (trigger) or acts (action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Trigger,
    Action,
}

impl std::fmt::Display for StepRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Action => write!(f, "action"),
        }
    }
}

impl std::str::FromStr for StepRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger" => Ok(Self::Trigger),
            "action" => Ok(Self::Action),
            other => Err(format!("unknown step role: {other}")),
        }
    }
}

/// One trigger or action inside an automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub automation_id: Uuid,
    pub role: StepRole,
    /// 0 for the trigger, ≥ 1 for actions.
    pub order: i32,
    /// Maps to a registered connector implementation.
    pub connector_id: String,
    /// Connector configuration.
    #[serde(default)]
    pub payload: Value,
    /// Step whose variables this action consumes.
    #[serde(default)]
    pub source_step_id: Option<Uuid>,
    #[serde(default)]
    pub connection_id: Option<Uuid>,
    /// Set once a push callback has been registered for this trigger.
    #[serde(default)]
    pub webhook_id: Option<Uuid>,
}

impl Step {
    /// A trigger step for `automation_id`.
    pub fn trigger(automation_id: Uuid, connector_id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            automation_id,
            role: StepRole::Trigger,
            order: 0,
            connector_id: connector_id.into(),
            payload,
            source_step_id: None,
            connection_id: None,
            webhook_id: None,
        }
    }

    /// An action step at `order`, fed by `source_step_id`.
    pub fn action(
        automation_id: Uuid,
        order: i32,
        connector_id: impl Into<String>,
        source_step_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            automation_id,
            role: StepRole::Action,
            order,
            connector_id: connector_id.into(),
            payload: Value::Object(Default::default()),
            source_step_id,
            connection_id: None,
            webhook_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A linked third-party account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub account_identifier: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// A persisted push-callback registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRecord {
    pub id: Uuid,
    pub secret: String,
}

// ---------------------------------------------------------------------------
// AutomationDefinition
// ---------------------------------------------------------------------------

/// An automation together with all of its steps, as found in definition
/// files and as assembled for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationDefinition {
    pub automation: Automation,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}
