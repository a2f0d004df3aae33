//! Sprint repository for PostgreSQL operations

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::data::error::DataError;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{SprintRow, SprintStatus, new_id};

const SPRINT_SELECT: &str = r#"
SELECT s.*, (SELECT COUNT(*) FROM issues i WHERE i.sprint_id = s.id) AS issue_count
FROM sprints s"#;

/// Fields for a new sprint
#[derive(Debug, Clone)]
pub struct NewSprint<'a> {
    pub project_id: &'a str,
    pub name: &'a str,
    pub goal: Option<&'a str>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: SprintStatus,
}

/// Sprints, optionally restricted to one project, most recent start first
pub async fn list_sprints(
    pool: &PgPool,
    project_id: Option<&str>,
) -> Result<Vec<SprintRow>, DataError> {
    let sql = format!(
        "{} WHERE ($1::TEXT IS NULL OR s.project_id = $1) \
         ORDER BY s.start_date DESC NULLS LAST, s.created_at DESC",
        SPRINT_SELECT
    );
    let rows = sqlx::query_as::<_, SprintRow>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Get a sprint by ID
pub async fn get_sprint(pool: &PgPool, id: &str) -> Result<Option<SprintRow>, DataError> {
    let sql = format!("{} WHERE s.id = $1", SPRINT_SELECT);
    let row = sqlx::query_as::<_, SprintRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Create a sprint; an unknown project surfaces as `DataError::InvalidReference`
pub async fn create_sprint(pool: &PgPool, sprint: NewSprint<'_>) -> Result<SprintRow, DataError> {
    let row = sqlx::query_as::<_, SprintRow>(
        r#"
        INSERT INTO sprints (id, project_id, name, goal, start_date, end_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new_id("sprint"))
    .bind(sprint.project_id)
    .bind(sprint.name)
    .bind(sprint.goal)
    .bind(sprint.start_date)
    .bind(sprint.end_date)
    .bind(sprint.status.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Apply a sparse update; `None` when the sprint does not exist
pub async fn update_sprint(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
) -> Result<Option<SprintRow>, DataError> {
    let updated: Option<SprintRow> = update.fetch_optional(pool, id).await?;
    if updated.is_none() {
        return Ok(None);
    }
    get_sprint(pool, id).await
}

/// Delete a sprint; linked issues keep existing with the sprint cleared
pub async fn delete_sprint(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM sprints WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
