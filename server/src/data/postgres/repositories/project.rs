//! Project repository for PostgreSQL operations
//!
//! Reads return `ProjectRow` with issue counts so callers can derive progress.
//! Visibility for non-Admin viewers is an `EXISTS` filter on `project_members`.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::data::error::DataError;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{ProjectRow, ProjectStatus, new_id};

use super::activity::insert_activity;

/// Project member label given to the creator
pub const OWNER_MEMBER_ROLE: &str = "Owner";

/// Project columns plus issue counts
const PROJECT_SELECT: &str = r#"
SELECT p.*,
    (SELECT COUNT(*) FROM issues i WHERE i.project_id = p.id) AS total_issues,
    (SELECT COUNT(*) FROM issues i
        WHERE i.project_id = p.id AND i.status IN ('Fixed', 'Closed')) AS completed_issues
FROM projects p"#;

/// Fields for a new project
#[derive(Debug, Clone)]
pub struct NewProject<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Filters for listing projects
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter<'a> {
    /// Restrict to projects this user is a member of; `None` sees everything
    pub member_id: Option<&'a str>,
    pub status: Option<ProjectStatus>,
    pub search: Option<&'a str>,
}

fn push_project_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &ProjectFilter<'a>) {
    qb.push(" WHERE TRUE");
    if let Some(member_id) = filter.member_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM project_members pm \
             WHERE pm.project_id = p.id AND pm.user_id = ",
        )
        .push_bind(member_id)
        .push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
        qb.push(" AND p.name ILIKE ")
            .push_bind(crate::utils::sql::contains_pattern(search));
    }
}

/// List projects visible under `filter`, newest first
pub async fn list_projects(
    pool: &PgPool,
    filter: &ProjectFilter<'_>,
    page: u32,
    limit: u32,
) -> Result<(Vec<ProjectRow>, u64), DataError> {
    let offset = page.saturating_sub(1) * limit;

    let mut qb = QueryBuilder::<Postgres>::new(PROJECT_SELECT);
    push_project_filters(&mut qb, filter);
    qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(offset as i64);
    let rows = qb.build_query_as::<ProjectRow>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects p");
    push_project_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((rows, total as u64))
}

/// Get a project by ID
pub async fn get_project(pool: &PgPool, id: &str) -> Result<Option<ProjectRow>, DataError> {
    let sql = format!("{} WHERE p.id = $1", PROJECT_SELECT);
    let row = sqlx::query_as::<_, ProjectRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Check whether a project exists
pub async fn project_exists(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Create a project, add the creator as its owner, and log the creation
///
/// All three writes share one transaction.
pub async fn create_project(
    pool: &PgPool,
    project: NewProject<'_>,
    creator_id: &str,
) -> Result<ProjectRow, DataError> {
    let id = new_id("project");
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        INSERT INTO projects (id, name, description, status, start_date, end_date, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(project.name)
    .bind(project.description)
    .bind(project.status.as_str())
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(creator_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3)")
        .bind(&id)
        .bind(creator_id)
        .bind(OWNER_MEMBER_ROLE)
        .execute(&mut *tx)
        .await?;

    insert_activity(
        &mut *tx,
        &id,
        Some(creator_id),
        &format!("created project {}", project.name),
        project.description,
    )
    .await?;

    tx.commit().await?;

    tracing::debug!(project_id = %id, %creator_id, "Project created");
    Ok(row)
}

/// Apply a sparse update, then re-read with counts; `None` when absent
pub async fn update_project(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
) -> Result<Option<ProjectRow>, DataError> {
    let updated: Option<ProjectRow> = update.fetch_optional(pool, id).await?;
    if updated.is_none() {
        return Ok(None);
    }
    get_project(pool, id).await
}

/// Delete a project; members, issues, sprints, epics and activities cascade
pub async fn delete_project(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Screenshot paths of every issue in a project (for attachment cleanup)
pub async fn list_project_screenshots(pool: &PgPool, id: &str) -> Result<Vec<String>, DataError> {
    let paths: Vec<String> =
        sqlx::query_scalar("SELECT UNNEST(screenshots) FROM issues WHERE project_id = $1")
            .bind(id)
            .fetch_all(pool)
            .await?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_listing_has_no_membership_filter() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects p");
        push_project_filters(&mut qb, &ProjectFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM projects p WHERE TRUE");
    }

    #[test]
    fn test_member_listing_uses_exists_filter() {
        let filter = ProjectFilter {
            member_id: Some("user-1"),
            status: Some(ProjectStatus::OnHold),
            search: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects p");
        push_project_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("EXISTS (SELECT 1 FROM project_members pm"));
        assert!(sql.contains("pm.user_id = $1"));
        assert!(sql.ends_with("AND p.status = $2"));
    }
}
