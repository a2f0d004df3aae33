//! Issue comment repository

use sqlx::PgPool;

use crate::data::error::DataError;
use crate::data::types::{CommentRow, new_id};

const COMMENT_SELECT: &str = r#"
SELECT c.*, u.name AS user_name, u.avatar AS user_avatar
FROM comments c
LEFT JOIN users u ON u.id = c.user_id"#;

/// Comments on an issue, oldest first
pub async fn list_for_issue(pool: &PgPool, issue_id: &str) -> Result<Vec<CommentRow>, DataError> {
    let sql = format!(
        "{} WHERE c.issue_id = $1 ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_SELECT
    );
    let rows = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(issue_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Get a comment by ID with author details
pub async fn get_comment(pool: &PgPool, id: &str) -> Result<Option<CommentRow>, DataError> {
    let sql = format!("{} WHERE c.id = $1", COMMENT_SELECT);
    let row = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Add a comment and return it with author details
pub async fn create_comment(
    pool: &PgPool,
    issue_id: &str,
    user_id: &str,
    content: &str,
) -> Result<CommentRow, DataError> {
    let id = new_id("comment");

    sqlx::query("INSERT INTO comments (id, issue_id, user_id, content) VALUES ($1, $2, $3, $4)")
        .bind(&id)
        .bind(issue_id)
        .bind(user_id)
        .bind(content)
        .execute(pool)
        .await?;

    get_comment(pool, &id)
        .await?
        .ok_or(DataError::Postgres(sqlx::Error::RowNotFound))
}

/// Replace a comment's content; `None` when the comment does not exist
pub async fn update_comment(
    pool: &PgPool,
    id: &str,
    content: &str,
) -> Result<Option<CommentRow>, DataError> {
    let result = sqlx::query("UPDATE comments SET content = $1, updated_at = NOW() WHERE id = $2")
        .bind(content)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_comment(pool, id).await
}

/// Delete a comment; returns false when no row matched
pub async fn delete_comment(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
