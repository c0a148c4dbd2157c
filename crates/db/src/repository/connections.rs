//! Connection reads.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ConnectionRow, DbError};

/// Fetch a single connection by its primary key.
pub async fn get_connection(pool: &PgPool, id: Uuid) -> Result<ConnectionRow, DbError> {
    sqlx::query_as::<_, ConnectionRow>(
        r#"
        SELECT id, owner_id, account_identifier, access_token, refresh_token
        FROM connections
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DbError::not_found("connection", id))
}
