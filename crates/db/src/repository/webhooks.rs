//! Webhook registration writes.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::WebhookRow, DbError};

/// Insert a webhook and point `step_id` at it in one transaction.
///
/// Nothing is written if the step does not exist.
pub async fn create_for_step(
    pool: &PgPool,
    step_id: Uuid,
    secret: &str,
) -> Result<WebhookRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, WebhookRow>(
        r#"
        INSERT INTO webhooks (id, secret, created_at)
        VALUES ($1, $2, $3)
        RETURNING id, secret, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(secret)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    let updated = sqlx::query("UPDATE steps SET webhook_id = $1 WHERE id = $2")
        .bind(row.id)
        .bind(step_id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::not_found("step", step_id));
    }

    tx.commit().await?;
    Ok(row)
}
