//! [`AutomationStore`] over the `db` crate's Postgres repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use db::models::{AutomationRow, ConnectionRow, StepRow};
use db::repository::{automations, connections, steps, webhooks};
use db::{DbError, DbPool};

use super::AutomationStore;
use crate::models::{Automation, Connection, Step, StepRole, WebhookRecord};

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AutomationStore for PgStore {
    async fn list_active_automations(&self) -> Result<Vec<Automation>, DbError> {
        let rows = automations::list_active_automations(&self.pool).await?;
        Ok(rows.into_iter().map(automation_from_row).collect())
    }

    async fn get_trigger_step(&self, automation_id: Uuid) -> Result<Step, DbError> {
        step_from_row(steps::get_trigger_step(&self.pool, automation_id).await?)
    }

    async fn list_action_steps(&self, automation_id: Uuid) -> Result<Vec<Step>, DbError> {
        steps::list_action_steps(&self.pool, automation_id)
            .await?
            .into_iter()
            .map(step_from_row)
            .collect()
    }

    async fn get_connection(&self, connection_id: Uuid) -> Result<Connection, DbError> {
        let row = connections::get_connection(&self.pool, connection_id).await?;
        Ok(connection_from_row(row))
    }

    async fn update_automation(
        &self,
        automation_id: Uuid,
        last_run_at: DateTime<Utc>,
        last_trigger_data: Option<Value>,
    ) -> Result<(), DbError> {
        automations::update_run_state(&self.pool, automation_id, last_run_at, last_trigger_data).await
    }

    async fn create_webhook(&self, step_id: Uuid, secret: &str) -> Result<WebhookRecord, DbError> {
        let row = webhooks::create_for_step(&self.pool, step_id, secret).await?;
        Ok(WebhookRecord {
            id: row.id,
            secret: row.secret,
        })
    }
}

fn automation_from_row(row: AutomationRow) -> Automation {
    Automation {
        id: row.id,
        name: row.name,
        is_active: row.is_active,
        last_run_at: row.last_run_at,
        last_trigger_data: row.last_trigger_data,
    }
}

fn step_from_row(row: StepRow) -> Result<Step, DbError> {
    let role = row.role.parse::<StepRole>().map_err(|message| DbError::Corrupt {
        entity: "step",
        message,
    })?;

    Ok(Step {
        id: row.id,
        automation_id: row.automation_id,
        role,
        order: row.step_order,
        connector_id: row.connector_id,
        payload: row.payload,
        source_step_id: row.source_step_id,
        connection_id: row.connection_id,
        webhook_id: row.webhook_id,
    })
}

fn connection_from_row(row: ConnectionRow) -> Connection {
    Connection {
        id: row.id,
        owner_id: row.owner_id,
        account_identifier: row.account_identifier,
        access_token: row.access_token,
        refresh_token: row.refresh_token,
    }
}
