//! Issue type repository
//!
//! Issue types are reference data for the UI; the four built-in types are
//! seeded with the schema.

use sqlx::PgPool;

use crate::data::error::DataError;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{IssueTypeRow, new_id};

/// Fields for a new issue type
#[derive(Debug, Clone)]
pub struct NewIssueType<'a> {
    pub name: &'a str,
    pub icon: Option<&'a str>,
    pub color: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// All issue types, alphabetically
pub async fn list_issue_types(pool: &PgPool) -> Result<Vec<IssueTypeRow>, DataError> {
    let rows = sqlx::query_as::<_, IssueTypeRow>("SELECT * FROM issue_types ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_issue_type(pool: &PgPool, id: &str) -> Result<Option<IssueTypeRow>, DataError> {
    let row = sqlx::query_as::<_, IssueTypeRow>("SELECT * FROM issue_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_issue_type(
    pool: &PgPool,
    issue_type: NewIssueType<'_>,
) -> Result<IssueTypeRow, DataError> {
    let row = sqlx::query_as::<_, IssueTypeRow>(
        r#"
        INSERT INTO issue_types (id, name, icon, color, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(new_id("issuetype"))
    .bind(issue_type.name)
    .bind(issue_type.icon)
    .bind(issue_type.color)
    .bind(issue_type.description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Apply a sparse update; `None` when the issue type does not exist
pub async fn update_issue_type(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
) -> Result<Option<IssueTypeRow>, DataError> {
    update.fetch_optional(pool, id).await
}

pub async fn delete_issue_type(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM issue_types WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
