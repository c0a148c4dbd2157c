//! The connector capability traits: the contract every service connector
//! must fulfil.
//!
//! Defined here (in the connectors crate) so both the engine and individual
//! connector implementations can import them without a circular dependency.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{ActionRunResult, ConnectorError, TriggerCheckResult, Variable};

/// How the engine learns that a trigger fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    /// Pushed by the external service; never polled.
    Webhook,
    /// Time based; fires whenever it is due.
    Schedule,
    /// Polled and diffed against the stored snapshot.
    Polling,
}

impl TriggerKind {
    pub fn is_polled(self) -> bool {
        !matches!(self, Self::Webhook)
    }
}

/// Everything a trigger connector is constructed with.
#[derive(Debug, Clone)]
pub struct TriggerParams {
    pub step_id: Uuid,
    pub kind: TriggerKind,
    pub last_execution_time: Option<DateTime<Utc>>,
    pub last_comparison_data: Option<Value>,
    pub polling_interval: Duration,
    pub access_token: Option<String>,
    pub payload: Value,
}

/// Everything an action connector is constructed with.
#[derive(Debug, Clone)]
pub struct ActionParams {
    pub step_id: Uuid,
    pub access_token: Option<String>,
    pub payload: Value,
}

/// A trigger connector: observes an external service.
#[async_trait]
pub trait TriggerConnector: Send + Sync {
    /// ID of the step this connector was built for.
    fn step_id(&self) -> Uuid;

    /// Look at the external service and report whether something new
    /// happened since the snapshot the connector was constructed with.
    ///
    /// Polling connectors should follow the snapshot protocol implemented
    /// by [`crate::snapshot::detect_new`].
    async fn check(&self) -> Result<TriggerCheckResult, ConnectorError>;

    /// Register a push callback at `url` signed with `secret`.
    ///
    /// Only webhook connectors override this. Returns `Ok(false)` when the
    /// service refused the registration.
    async fn hook(&self, _url: &str, _secret: &str) -> Result<bool, ConnectorError> {
        Err(ConnectorError::Unsupported(
            "connector does not accept webhook registrations".into(),
        ))
    }
}

/// An action connector: performs one operation on an external service.
#[async_trait]
pub trait ActionConnector: Send + Sync {
    /// Run the action with the variables wired in from its source step.
    async fn execute(&self, upstream: &[Variable]) -> Result<ActionRunResult, ConnectorError>;
}
