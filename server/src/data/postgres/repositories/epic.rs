//! Epic repository for PostgreSQL operations
//!
//! Reads carry issue counts so progress is derived the same way as for projects.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::data::error::DataError;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{EpicRow, EpicStatus, new_id};

const EPIC_SELECT: &str = r#"
SELECT e.*,
    (SELECT COUNT(*) FROM issues i WHERE i.epic_id = e.id) AS total_issues,
    (SELECT COUNT(*) FROM issues i
        WHERE i.epic_id = e.id AND i.status IN ('Fixed', 'Closed')) AS completed_issues
FROM epics e"#;

/// Fields for a new epic
#[derive(Debug, Clone)]
pub struct NewEpic<'a> {
    pub project_id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub status: EpicStatus,
    pub color: Option<&'a str>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Epics, optionally restricted to one project, newest first
pub async fn list_epics(pool: &PgPool, project_id: Option<&str>) -> Result<Vec<EpicRow>, DataError> {
    let sql = format!(
        "{} WHERE ($1::TEXT IS NULL OR e.project_id = $1) ORDER BY e.created_at DESC, e.id DESC",
        EPIC_SELECT
    );
    let rows = sqlx::query_as::<_, EpicRow>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Get an epic by ID
pub async fn get_epic(pool: &PgPool, id: &str) -> Result<Option<EpicRow>, DataError> {
    let sql = format!("{} WHERE e.id = $1", EPIC_SELECT);
    let row = sqlx::query_as::<_, EpicRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_epic(pool: &PgPool, epic: NewEpic<'_>) -> Result<EpicRow, DataError> {
    let row = sqlx::query_as::<_, EpicRow>(
        r#"
        INSERT INTO epics (id, project_id, name, description, status, color, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(new_id("epic"))
    .bind(epic.project_id)
    .bind(epic.name)
    .bind(epic.description)
    .bind(epic.status.as_str())
    .bind(epic.color)
    .bind(epic.start_date)
    .bind(epic.end_date)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Apply a sparse update, then re-read with counts; `None` when absent
pub async fn update_epic(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
) -> Result<Option<EpicRow>, DataError> {
    let updated: Option<EpicRow> = update.fetch_optional(pool, id).await?;
    if updated.is_none() {
        return Ok(None);
    }
    get_epic(pool, id).await
}

/// Delete an epic; linked issues keep existing with the epic cleared
pub async fn delete_epic(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM epics WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
