//! Step reads.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::StepRow, DbError};

const STEP_COLUMNS: &str = "id, automation_id, role, step_order, connector_id, payload, \
                            source_step_id, connection_id, webhook_id";

/// Fetch the trigger step (role `trigger`, order 0) of an automation.
pub async fn get_trigger_step(pool: &PgPool, automation_id: Uuid) -> Result<StepRow, DbError> {
    let sql = format!(
        "SELECT {STEP_COLUMNS} FROM steps \
         WHERE automation_id = $1 AND role = 'trigger' AND step_order = 0"
    );

    sqlx::query_as::<_, StepRow>(&sql)
        .bind(automation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found("trigger step", automation_id))
}

/// Return the action steps of an automation in ascending order.
pub async fn list_action_steps(pool: &PgPool, automation_id: Uuid) -> Result<Vec<StepRow>, DbError> {
    let sql = format!(
        "SELECT {STEP_COLUMNS} FROM steps \
         WHERE automation_id = $1 AND role = 'action' \
         ORDER BY step_order ASC"
    );

    let rows = sqlx::query_as::<_, StepRow>(&sql)
        .bind(automation_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
