//! Issue watcher repository

use sqlx::PgPool;

use crate::data::error::DataError;
use crate::data::types::WatcherRow;

/// Watchers of an issue with user details
pub async fn list_watchers(pool: &PgPool, issue_id: &str) -> Result<Vec<WatcherRow>, DataError> {
    let rows = sqlx::query_as::<_, WatcherRow>(
        r#"
        SELECT w.issue_id, w.user_id, u.name, u.email, w.created_at
        FROM issue_watchers w
        JOIN users u ON u.id = w.user_id
        WHERE w.issue_id = $1
        ORDER BY w.created_at ASC
        "#,
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Start watching; watching twice is a no-op. Returns true when a row was added
pub async fn add_watcher(pool: &PgPool, issue_id: &str, user_id: &str) -> Result<bool, DataError> {
    let result = sqlx::query(
        "INSERT INTO issue_watchers (issue_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(issue_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Stop watching; returns false when the user was not watching
pub async fn remove_watcher(pool: &PgPool, issue_id: &str, user_id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM issue_watchers WHERE issue_id = $1 AND user_id = $2")
        .bind(issue_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
