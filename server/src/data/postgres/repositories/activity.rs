//! Activity log repository (append-only)

use sqlx::{Executor, PgPool, Postgres};

use crate::data::error::DataError;
use crate::data::types::{ActivityRow, new_id};

/// Append an activity entry; accepts a pool or an open transaction
pub async fn insert_activity<'e, E>(
    executor: E,
    project_id: &str,
    user_id: Option<&str>,
    action: &str,
    details: Option<&str>,
) -> Result<ActivityRow, DataError>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, ActivityRow>(
        r#"
        INSERT INTO activities (id, project_id, user_id, action, details)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(new_id("activity"))
    .bind(project_id)
    .bind(user_id)
    .bind(action)
    .bind(details)
    .fetch_one(executor)
    .await?;

    tracing::trace!(%project_id, %action, "Activity recorded");
    Ok(row)
}

/// Most recent activities for a project, newest first
pub async fn list_for_project(
    pool: &PgPool,
    project_id: &str,
    limit: u32,
) -> Result<Vec<ActivityRow>, DataError> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT a.*, u.name AS user_name
        FROM activities a
        LEFT JOIN users u ON u.id = a.user_id
        WHERE a.project_id = $1
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT $2
        "#,
    )
    .bind(project_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
