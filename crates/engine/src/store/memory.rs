//! In-memory store for tests and single-file deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use db::DbError;

use super::AutomationStore;
use crate::models::{Automation, AutomationDefinition, Connection, Step, StepRole, WebhookRecord};

#[derive(Default)]
struct Tables {
    /// Insertion order, so listings are stable.
    order: Vec<Uuid>,
    automations: HashMap<Uuid, Automation>,
    steps: HashMap<Uuid, Step>,
    connections: HashMap<Uuid, Connection>,
    webhooks: HashMap<Uuid, WebhookRecord>,
}

/// [`AutomationStore`] backed by `HashMap`s behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an automation with its steps and connections.
    pub async fn insert(&self, definition: AutomationDefinition) {
        let mut tables = self.tables.write().await;
        let id = definition.automation.id;
        if !tables.automations.contains_key(&id) {
            tables.order.push(id);
        }
        tables.steps.retain(|_, step| step.automation_id != id);
        tables.automations.insert(id, definition.automation);
        for step in definition.steps {
            tables.steps.insert(step.id, step);
        }
        for connection in definition.connections {
            tables.connections.insert(connection.id, connection);
        }
    }

    pub async fn automation(&self, id: Uuid) -> Option<Automation> {
        self.tables.read().await.automations.get(&id).cloned()
    }

    pub async fn step(&self, id: Uuid) -> Option<Step> {
        self.tables.read().await.steps.get(&id).cloned()
    }

    pub async fn webhook(&self, id: Uuid) -> Option<WebhookRecord> {
        self.tables.read().await.webhooks.get(&id).cloned()
    }

    pub async fn webhook_count(&self) -> usize {
        self.tables.read().await.webhooks.len()
    }

    /// Apply `edit` to a stored step, e.g. to change its payload between runs.
    pub async fn update_step(&self, id: Uuid, edit: impl FnOnce(&mut Step)) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let step = tables
            .steps
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("step", id))?;
        edit(step);
        Ok(())
    }
}

#[async_trait]
impl AutomationStore for InMemoryStore {
    async fn list_active_automations(&self) -> Result<Vec<Automation>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .order
            .iter()
            .filter_map(|id| tables.automations.get(id))
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn get_trigger_step(&self, automation_id: Uuid) -> Result<Step, DbError> {
        let tables = self.tables.read().await;
        tables
            .steps
            .values()
            .find(|s| s.automation_id == automation_id && s.role == StepRole::Trigger && s.order == 0)
            .cloned()
            .ok_or_else(|| DbError::not_found("trigger step", automation_id))
    }

    async fn list_action_steps(&self, automation_id: Uuid) -> Result<Vec<Step>, DbError> {
        let tables = self.tables.read().await;
        let mut steps: Vec<Step> = tables
            .steps
            .values()
            .filter(|s| s.automation_id == automation_id && s.role == StepRole::Action)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.order);
        Ok(steps)
    }

    async fn get_connection(&self, connection_id: Uuid) -> Result<Connection, DbError> {
        self.tables
            .read()
            .await
            .connections
            .get(&connection_id)
            .cloned()
            .ok_or_else(|| DbError::not_found("connection", connection_id))
    }

    async fn update_automation(
        &self,
        automation_id: Uuid,
        last_run_at: DateTime<Utc>,
        last_trigger_data: Option<Value>,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let automation = tables
            .automations
            .get_mut(&automation_id)
            .ok_or_else(|| DbError::not_found("automation", automation_id))?;
        automation.last_run_at = Some(last_run_at);
        automation.last_trigger_data = last_trigger_data;
        Ok(())
    }

    async fn create_webhook(&self, step_id: Uuid, secret: &str) -> Result<WebhookRecord, DbError> {
        let mut tables = self.tables.write().await;
        let step = tables
            .steps
            .get_mut(&step_id)
            .ok_or_else(|| DbError::not_found("step", step_id))?;

        let record = WebhookRecord {
            id: Uuid::new_v4(),
            secret: secret.to_owned(),
        };
        step.webhook_id = Some(record.id);
        tables.webhooks.insert(record.id, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> AutomationDefinition {
        let automation = Automation::new("copy files");
        let trigger = Step::trigger(automation.id, "folder.new_file", json!({ "files": [] }));
        let second = Step::action(automation.id, 2, "util.log", Some(trigger.id));
        let first = Step::action(automation.id, 1, "util.log", Some(trigger.id));
        AutomationDefinition {
            automation,
            steps: vec![trigger, second, first],
            connections: Vec::new(),
        }
    }

    #[tokio::test]
    async fn action_steps_come_back_in_order() {
        let store = InMemoryStore::new();
        let def = definition();
        let id = def.automation.id;
        store.insert(def).await;

        let orders: Vec<i32> = store
            .list_action_steps(id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.order)
            .collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(store.get_trigger_step(id).await.unwrap().order, 0);
    }

    #[tokio::test]
    async fn inactive_automations_are_not_listed() {
        let store = InMemoryStore::new();
        let mut def = definition();
        def.automation.is_active = false;
        store.insert(def).await;
        store.insert(definition()).await;

        assert_eq!(store.list_active_automations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn webhook_creation_attaches_to_step() {
        let store = InMemoryStore::new();
        let def = definition();
        let trigger_id = def.steps[0].id;
        store.insert(def).await;

        let record = store.create_webhook(trigger_id, "s3cret").await.unwrap();
        assert_eq!(store.step(trigger_id).await.unwrap().webhook_id, Some(record.id));

        let missing = store.create_webhook(Uuid::new_v4(), "s3cret").await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
        assert_eq!(store.webhook_count().await, 1);
    }
}
