//! Resolves the `connector_id` stored on a step to a constructible trigger
//! or action implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use connectors::builtin::{self, FolderTrigger, IntervalTrigger, LogAction};
use connectors::{ActionConnector, ActionParams, TriggerConnector, TriggerKind, TriggerParams};

use crate::models::StepRole;
use crate::EngineError;

/// Builds a trigger connector from its construction params.
pub type TriggerFactory = Arc<dyn Fn(TriggerParams) -> Box<dyn TriggerConnector> + Send + Sync>;

/// Builds an action connector from its construction params.
pub type ActionFactory = Arc<dyn Fn(ActionParams) -> Box<dyn ActionConnector> + Send + Sync>;

/// Payload key that overrides a polled trigger's default interval.
pub const INTERVAL_OVERRIDE_KEY: &str = "interval_seconds";

/// A registered trigger implementation and how often it may be checked.
#[derive(Clone)]
pub struct TriggerRegistration {
    pub kind: TriggerKind,
    pub polling_interval: Duration,
    factory: TriggerFactory,
}

impl TriggerRegistration {
    /// Interval for a step, honouring a positive `interval_seconds` in its payload.
    pub fn interval_for(&self, payload: &Value) -> Duration {
        payload
            .get(INTERVAL_OVERRIDE_KEY)
            .and_then(Value::as_u64)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.polling_interval)
    }

    pub fn build(&self, params: TriggerParams) -> Box<dyn TriggerConnector> {
        (self.factory)(params)
    }
}

/// Maps connector IDs to their implementations.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    triggers: HashMap<String, TriggerRegistration>,
    actions: HashMap<String, ActionFactory>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the connectors that ship with the engine.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_trigger(
                builtin::SCHEDULE_INTERVAL,
                TriggerKind::Schedule,
                Duration::from_secs(300),
                |params| Box::new(IntervalTrigger::new(params)),
            )
            .register_trigger(
                builtin::FOLDER_NEW_FILE,
                TriggerKind::Polling,
                Duration::from_secs(60),
                |params| Box::new(FolderTrigger::new(params)),
            )
            .register_action(builtin::UTIL_LOG, |params| Box::new(LogAction::new(params)));
        registry
    }

    /// Register (or replace) a trigger implementation.
    pub fn register_trigger<F>(
        &mut self,
        connector_id: impl Into<String>,
        kind: TriggerKind,
        polling_interval: Duration,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(TriggerParams) -> Box<dyn TriggerConnector> + Send + Sync + 'static,
    {
        self.triggers.insert(
            connector_id.into(),
            TriggerRegistration {
                kind,
                polling_interval,
                factory: Arc::new(factory),
            },
        );
        self
    }

    /// Register (or replace) an action implementation.
    pub fn register_action<F>(&mut self, connector_id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(ActionParams) -> Box<dyn ActionConnector> + Send + Sync + 'static,
    {
        self.actions.insert(connector_id.into(), Arc::new(factory));
        self
    }

    /// Look up a trigger registration.
    ///
    /// # Errors
    /// [`EngineError::UnknownConnector`] if nothing is registered under `connector_id`.
    pub fn trigger(&self, connector_id: &str) -> Result<&TriggerRegistration, EngineError> {
        self.triggers
            .get(connector_id)
            .ok_or_else(|| unknown(connector_id, StepRole::Trigger))
    }

    /// Construct the trigger connector registered under `connector_id`.
    pub fn build_trigger(
        &self,
        connector_id: &str,
        params: TriggerParams,
    ) -> Result<Box<dyn TriggerConnector>, EngineError> {
        Ok(self.trigger(connector_id)?.build(params))
    }

    /// Construct the action connector registered under `connector_id`.
    pub fn build_action(
        &self,
        connector_id: &str,
        params: ActionParams,
    ) -> Result<Box<dyn ActionConnector>, EngineError> {
        let factory = self
            .actions
            .get(connector_id)
            .ok_or_else(|| unknown(connector_id, StepRole::Action))?;
        Ok(factory(params))
    }

    /// Fail unless `connector_id` is registered for `role`.
    pub fn ensure_known(&self, role: StepRole, connector_id: &str) -> Result<(), EngineError> {
        let known = match role {
            StepRole::Trigger => self.triggers.contains_key(connector_id),
            StepRole::Action => self.actions.contains_key(connector_id),
        };
        if known {
            Ok(())
        } else {
            Err(unknown(connector_id, role))
        }
    }

    /// Registered IDs for `role`, sorted.
    pub fn connector_ids(&self, role: StepRole) -> Vec<&str> {
        let mut ids: Vec<&str> = match role {
            StepRole::Trigger => self.triggers.keys().map(String::as_str).collect(),
            StepRole::Action => self.actions.keys().map(String::as_str).collect(),
        };
        ids.sort_unstable();
        ids
    }
}

fn unknown(connector_id: &str, role: StepRole) -> EngineError {
    EngineError::UnknownConnector {
        connector_id: connector_id.to_owned(),
        role,
    }
}
