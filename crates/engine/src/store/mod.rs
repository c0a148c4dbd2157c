//! The persistence contract the engine consumes.
//!
//! The engine treats every call as a fresh read: nothing is cached across
//! scheduler cycles beyond what the store itself keeps.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use db::DbError;

use crate::models::{Automation, Connection, Step, WebhookRecord};

#[async_trait]
pub trait AutomationStore: Send + Sync {
    /// Every automation with `is_active = true`.
    async fn list_active_automations(&self) -> Result<Vec<Automation>, DbError>;

    /// The trigger step (order 0) of `automation_id`.
    async fn get_trigger_step(&self, automation_id: Uuid) -> Result<Step, DbError>;

    /// Action steps of `automation_id`, ascending by order.
    async fn list_action_steps(&self, automation_id: Uuid) -> Result<Vec<Step>, DbError>;

    async fn get_connection(&self, connection_id: Uuid) -> Result<Connection, DbError>;

    /// Record the outcome of a successful trigger evaluation.
    async fn update_automation(
        &self,
        automation_id: Uuid,
        last_run_at: DateTime<Utc>,
        last_trigger_data: Option<Value>,
    ) -> Result<(), DbError>;

    /// Persist a webhook secret and attach the new record to `step_id`.
    /// Either both happen or neither does.
    async fn create_webhook(&self, step_id: Uuid, secret: &str) -> Result<WebhookRecord, DbError>;
}

/// Access token of the connection a step is linked to, if any.
pub async fn access_token_for(
    store: &dyn AutomationStore,
    step: &Step,
) -> Result<Option<String>, DbError> {
    match step.connection_id {
        None => Ok(None),
        Some(id) => Ok(Some(store.get_connection(id).await?.access_token)),
    }
}
