//! `engine` crate — domain models, validation, and the automation
//! execution engine: trigger evaluation, action chaining, the scheduler
//! loop and webhook registration.

pub mod action;
pub mod boundary;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod trigger;
pub mod validate;
pub mod webhook;

pub use action::{ActionExecutor, JobsData, StepOutcome};
pub use config::EngineConfig;
pub use coordinator::{PassOutcome, ZapCoordinator};
pub use error::EngineError;
pub use models::{Automation, AutomationDefinition, Connection, Step, StepRole, WebhookRecord};
pub use registry::ConnectorRegistry;
pub use scheduler::{CycleSummary, SchedulerLoop};
pub use store::{AutomationStore, InMemoryStore, PgStore};
pub use trigger::{Evaluation, TriggerEvaluator};
pub use validate::validate_automation;
pub use webhook::WebhookRegistrar;

#[cfg(test)]
mod coordinator_tests;
