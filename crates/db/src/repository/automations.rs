//! Automation reads and run-state writes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::AutomationRow, DbError};

/// Return every active automation, oldest first.
pub async fn list_active_automations(pool: &PgPool) -> Result<Vec<AutomationRow>, DbError> {
    let rows = sqlx::query_as::<_, AutomationRow>(
        r#"
        SELECT id, name, is_active, last_run_at, last_trigger_data
        FROM automations
        WHERE is_active
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Record the outcome of a trigger evaluation.
///
/// Returns `DbError::NotFound` if the automation no longer exists.
pub async fn update_run_state(
    pool: &PgPool,
    id: Uuid,
    last_run_at: DateTime<Utc>,
    last_trigger_data: Option<serde_json::Value>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE automations
        SET last_run_at = $1, last_trigger_data = $2
        WHERE id = $3
        "#,
    )
    .bind(last_run_at)
    .bind(last_trigger_data)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("automation", id));
    }

    Ok(())
}
