//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models and carry no domain behaviour.
//! Domain types live in the `engine` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// automations
// ---------------------------------------------------------------------------

/// A persisted automation row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AutomationRow {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Opaque snapshot written by the trigger connector.
    pub last_trigger_data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// steps
// ---------------------------------------------------------------------------

/// A persisted step row. `role` is `'trigger'` or `'action'`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StepRow {
    pub id: Uuid,
    pub automation_id: Uuid,
    pub role: String,
    pub step_order: i32,
    pub connector_id: String,
    pub payload: serde_json::Value,
    pub source_step_id: Option<Uuid>,
    pub connection_id: Option<Uuid>,
    pub webhook_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// connections
// ---------------------------------------------------------------------------

/// A linked third-party account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConnectionRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub account_identifier: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

// ---------------------------------------------------------------------------
// webhooks
// ---------------------------------------------------------------------------

/// A registered push callback.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookRow {
    pub id: Uuid,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}
