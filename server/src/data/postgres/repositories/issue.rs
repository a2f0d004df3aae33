//! Issue repository for PostgreSQL operations
//!
//! Issue writes log an activity entry in the same transaction. Bug ids are
//! allocated as `MAX(bug_seq) + 1` per project; a concurrent creator that
//! loses the race hits a unique constraint and the allocation is retried.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::constants::{
    BUG_ID_MAX_ATTEMPTS, BUG_ID_PREFIX, BUG_ID_RETRY_BASE_DELAY_MS, BUG_ID_SUFFIX_LEN,
};
use crate::data::error::DataError;
use crate::data::postgres::schema::BUG_ID_CONSTRAINTS;
use crate::data::sparse::{SparseUpdate, SqlValue};
use crate::data::types::{IssueKind, IssueRow, IssueStatus, Priority, Severity, new_id};
use crate::utils::retry::retry_with_backoff;

use super::activity::insert_activity;

/// Issue columns joined with people, project name and comment count
const ISSUE_SELECT: &str = r#"
SELECT i.*,
    p.name AS project_name,
    assignee.name AS assignee_name,
    reporter.name AS reporter_name,
    (SELECT COUNT(*) FROM comments c WHERE c.issue_id = i.id) AS comment_count
FROM issues i
JOIN projects p ON p.id = i.project_id
LEFT JOIN users assignee ON assignee.id = i.assigned_to
LEFT JOIN users reporter ON reporter.id = i.reported_by"#;

/// Fields for a new issue
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub module_name: Option<String>,
    pub issue_type: IssueKind,
    pub severity: Severity,
    pub status: IssueStatus,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub reported_by: Option<String>,
    pub steps_to_reproduce: Option<String>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub environment: Option<String>,
    pub screenshots: Vec<String>,
    pub related_links: serde_json::Value,
    pub labels: Vec<String>,
    pub epic_id: Option<String>,
    pub sprint_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Filters for listing issues
#[derive(Debug, Clone, Default)]
pub struct IssueFilter<'a> {
    /// Restrict to projects this user is a member of; `None` sees everything
    pub member_id: Option<&'a str>,
    pub project_id: Option<&'a str>,
    pub status: Option<IssueStatus>,
    pub severity: Option<Severity>,
    pub priority: Option<Priority>,
    pub issue_type: Option<IssueKind>,
    pub assigned_to: Option<&'a str>,
    pub reported_by: Option<&'a str>,
    pub sprint_id: Option<&'a str>,
    pub epic_id: Option<&'a str>,
    pub label: Option<&'a str>,
    pub search: Option<&'a str>,
}

// ============================================================================
// Bug ids
// ============================================================================

/// Suffix derived from a project id: the last `-` segment, last 4 chars, uppercased
pub fn bug_id_suffix(project_id: &str) -> String {
    let segment = project_id.rsplit('-').next().unwrap_or(project_id);
    let chars: Vec<char> = segment.chars().collect();
    let start = chars.len().saturating_sub(BUG_ID_SUFFIX_LEN);
    chars[start..].iter().collect::<String>().to_uppercase()
}

/// Format a bug id, zero-padding the sequence to three digits
pub fn format_bug_id(project_id: &str, seq: i32) -> String {
    format!("{}-{}-{:03}", BUG_ID_PREFIX, bug_id_suffix(project_id), seq)
}

fn is_bug_id_collision(e: &DataError) -> bool {
    BUG_ID_CONSTRAINTS.iter().any(|c| e.is_conflict_on(c))
}

// ============================================================================
// Reads
// ============================================================================

fn push_issue_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &IssueFilter<'a>) {
    qb.push(" WHERE TRUE");
    if let Some(member_id) = filter.member_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM project_members pm \
             WHERE pm.project_id = i.project_id AND pm.user_id = ",
        )
        .push_bind(member_id)
        .push(")");
    }
    if let Some(project_id) = filter.project_id {
        qb.push(" AND i.project_id = ").push_bind(project_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND i.status = ").push_bind(status.as_str());
    }
    if let Some(severity) = filter.severity {
        qb.push(" AND i.severity = ").push_bind(severity.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND i.priority = ").push_bind(priority.as_str());
    }
    if let Some(issue_type) = filter.issue_type {
        qb.push(" AND i.issue_type = ").push_bind(issue_type.as_str());
    }
    if let Some(assigned_to) = filter.assigned_to {
        qb.push(" AND i.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(reported_by) = filter.reported_by {
        qb.push(" AND i.reported_by = ").push_bind(reported_by);
    }
    if let Some(sprint_id) = filter.sprint_id {
        qb.push(" AND i.sprint_id = ").push_bind(sprint_id);
    }
    if let Some(epic_id) = filter.epic_id {
        qb.push(" AND i.epic_id = ").push_bind(epic_id);
    }
    if let Some(label) = filter.label {
        qb.push(" AND ").push_bind(label).push(" = ANY(i.labels)");
    }
    if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
        let pattern = crate::utils::sql::contains_pattern(search);
        qb.push(" AND (i.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.bug_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// List issues matching `filter`, newest first
pub async fn list_issues(
    pool: &PgPool,
    filter: &IssueFilter<'_>,
    page: u32,
    limit: u32,
) -> Result<(Vec<IssueRow>, u64), DataError> {
    let offset = page.saturating_sub(1) * limit;

    let mut qb = QueryBuilder::<Postgres>::new(ISSUE_SELECT);
    push_issue_filters(&mut qb, filter);
    qb.push(" ORDER BY i.created_at DESC, i.id DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(offset as i64);
    let rows = qb.build_query_as::<IssueRow>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM issues i");
    push_issue_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((rows, total as u64))
}

/// Get an issue by ID with joined names
pub async fn get_issue(pool: &PgPool, id: &str) -> Result<Option<IssueRow>, DataError> {
    let sql = format!("{} WHERE i.id = $1", ISSUE_SELECT);
    let row = sqlx::query_as::<_, IssueRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Project that owns an issue
pub async fn get_issue_project_id(pool: &PgPool, id: &str) -> Result<Option<String>, DataError> {
    let project_id: Option<String> =
        sqlx::query_scalar("SELECT project_id FROM issues WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(project_id)
}

// ============================================================================
// Writes
// ============================================================================

/// Create an issue with a freshly allocated bug id
///
/// Retries on a bug id collision; after the last attempt the collision is
/// returned as `DataError::Conflict`.
pub async fn create_issue(
    pool: &PgPool,
    issue: &NewIssue,
    actor_id: &str,
) -> Result<IssueRow, DataError> {
    let id = retry_with_backoff(
        BUG_ID_MAX_ATTEMPTS,
        BUG_ID_RETRY_BASE_DELAY_MS,
        is_bug_id_collision,
        |_| try_create_issue(pool, issue, actor_id),
    )
    .await?;

    get_issue(pool, &id)
        .await?
        .ok_or_else(|| DataError::Postgres(sqlx::Error::RowNotFound))
}

/// One allocation attempt; returns the new issue id
async fn try_create_issue(
    pool: &PgPool,
    issue: &NewIssue,
    actor_id: &str,
) -> Result<String, DataError> {
    let mut tx = pool.begin().await?;

    let next_seq: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(bug_seq), 0) + 1 FROM issues WHERE project_id = $1",
    )
    .bind(&issue.project_id)
    .fetch_one(&mut *tx)
    .await?;

    let id = new_id("issue");
    let bug_id = format_bug_id(&issue.project_id, next_seq);

    sqlx::query(
        r#"
        INSERT INTO issues (
            id, bug_id, bug_seq, project_id, title, description, module_name, issue_type,
            severity, status, priority, assigned_to, reported_by, steps_to_reproduce,
            expected_result, actual_result, environment, screenshots, related_links, labels,
            epic_id, sprint_id, due_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23)
        "#,
    )
    .bind(&id)
    .bind(&bug_id)
    .bind(next_seq)
    .bind(&issue.project_id)
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(&issue.module_name)
    .bind(issue.issue_type.as_str())
    .bind(issue.severity.as_str())
    .bind(issue.status.as_str())
    .bind(issue.priority.as_str())
    .bind(&issue.assigned_to)
    .bind(&issue.reported_by)
    .bind(&issue.steps_to_reproduce)
    .bind(&issue.expected_result)
    .bind(&issue.actual_result)
    .bind(&issue.environment)
    .bind(&issue.screenshots)
    .bind(&issue.related_links)
    .bind(&issue.labels)
    .bind(&issue.epic_id)
    .bind(&issue.sprint_id)
    .bind(issue.due_date)
    .execute(&mut *tx)
    .await?;

    insert_activity(
        &mut *tx,
        &issue.project_id,
        Some(actor_id),
        &format!("created issue {}", bug_id),
        Some(&issue.title),
    )
    .await?;

    tx.commit().await?;

    tracing::debug!(issue_id = %id, %bug_id, "Issue created");
    Ok(id)
}

/// Activity text for an issue update
pub fn update_activity_message(bug_id: &str, old_status: &str, new_status: Option<&str>) -> String {
    match new_status {
        Some(new) if new != old_status => {
            format!("changed status of {} from {} to {}", bug_id, old_status, new)
        }
        _ => format!("updated issue {}", bug_id),
    }
}

/// Apply a sparse update and log it; `None` when the issue does not exist
pub async fn update_issue(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
    actor_id: &str,
) -> Result<Option<IssueRow>, DataError> {
    let mut tx = pool.begin().await?;

    let current: Option<(String, String, String)> = sqlx::query_as(
        "SELECT bug_id, project_id, status FROM issues WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((bug_id, project_id, old_status)) = current else {
        return Ok(None);
    };

    let new_status = match update.value("status") {
        Some(SqlValue::Text(Some(s))) => Some(s.clone()),
        _ => None,
    };
    let columns = update.columns().join(", ");

    let updated: Option<IssueRow> = update.fetch_optional(&mut *tx, id).await?;
    if updated.is_none() {
        return Ok(None);
    }

    insert_activity(
        &mut *tx,
        &project_id,
        Some(actor_id),
        &update_activity_message(&bug_id, &old_status, new_status.as_deref()),
        Some(&columns),
    )
    .await?;

    tx.commit().await?;
    get_issue(pool, id).await
}

/// Delete an issue and log it; returns the deleted row for attachment cleanup
pub async fn delete_issue(
    pool: &PgPool,
    id: &str,
    actor_id: &str,
) -> Result<Option<IssueRow>, DataError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query_as::<_, IssueRow>("DELETE FROM issues WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = deleted else {
        return Ok(None);
    };

    insert_activity(
        &mut *tx,
        &row.project_id,
        Some(actor_id),
        &format!("deleted issue {}", row.bug_id),
        Some(&row.title),
    )
    .await?;

    tx.commit().await?;
    Ok(Some(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::postgres::repositories::{comment, project};
    use crate::data::postgres::testing::TestDatabase;
    use crate::data::types::Role;

    #[test]
    fn test_bug_id_suffix_uses_last_segment() {
        assert_eq!(bug_id_suffix("project-ckx9w2z1abcd"), "ABCD");
        assert_eq!(bug_id_suffix("project-1700000000123"), "0123");
    }

    #[test]
    fn test_bug_id_suffix_short_segment() {
        assert_eq!(bug_id_suffix("proj-ab"), "AB");
        assert_eq!(bug_id_suffix("xyz"), "XYZ");
    }

    #[test]
    fn test_format_bug_id_pads_sequence() {
        assert_eq!(format_bug_id("project-q7f3", 1), "BUG-Q7F3-001");
        assert_eq!(format_bug_id("project-q7f3", 42), "BUG-Q7F3-042");
        assert_eq!(format_bug_id("project-q7f3", 1234), "BUG-Q7F3-1234");
    }

    #[test]
    fn test_sequential_bug_ids_are_strictly_increasing() {
        let ids: Vec<String> = (1..=12).map(|seq| format_bug_id("project-zz99", seq)).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_bug_id_collision_detection() {
        assert!(is_bug_id_collision(&DataError::Conflict(
            "issues_project_bug_id_unique".to_string()
        )));
        assert!(is_bug_id_collision(&DataError::Conflict(
            "issues_project_seq_unique".to_string()
        )));
        assert!(!is_bug_id_collision(&DataError::Conflict(
            "users_email_unique".to_string()
        )));
    }

    #[test]
    fn test_update_activity_message() {
        assert_eq!(
            update_activity_message("BUG-AB12-003", "Open", Some("Fixed")),
            "changed status of BUG-AB12-003 from Open to Fixed"
        );
        assert_eq!(
            update_activity_message("BUG-AB12-003", "Open", Some("Open")),
            "updated issue BUG-AB12-003"
        );
        assert_eq!(
            update_activity_message("BUG-AB12-003", "Open", None),
            "updated issue BUG-AB12-003"
        );
    }

    #[test]
    fn test_issue_filters_scope_non_admins() {
        let filter = IssueFilter {
            member_id: Some("user-2"),
            label: Some("ui"),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM issues i");
        push_issue_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("pm.project_id = i.project_id AND pm.user_id = $1"));
        assert!(sql.ends_with("AND $2 = ANY(i.labels)"));
    }

    fn new_issue(project_id: &str, title: &str) -> NewIssue {
        NewIssue {
            project_id: project_id.to_string(),
            title: title.to_string(),
            severity: Severity::Critical,
            related_links: serde_json::json!([]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bug_ids_are_sequential_within_a_project() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let qa = db.user("Quinn", Role::Qa).await;
        db.project_with_id("project-k3v9", Some(&qa)).await;

        let first = create_issue(db.pool(), &new_issue("project-k3v9", "First"), &qa.id)
            .await
            .unwrap();
        let second = create_issue(db.pool(), &new_issue("project-k3v9", "Second"), &qa.id)
            .await
            .unwrap();
        assert_eq!(first.bug_id, "BUG-K3V9-001");
        assert_eq!(second.bug_id, "BUG-K3V9-002");
        assert_eq!(second.bug_seq, first.bug_seq + 1);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_projects_sharing_a_suffix_number_independently() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let qa = db.user("Quinn", Role::Qa).await;
        db.project_with_id("project-aaaahomb", Some(&qa)).await;
        db.project_with_id("project-bbbbhomb", Some(&qa)).await;

        let a = create_issue(db.pool(), &new_issue("project-aaaahomb", "A"), &qa.id)
            .await
            .unwrap();
        let b = create_issue(db.pool(), &new_issue("project-bbbbhomb", "B"), &qa.id)
            .await
            .unwrap();
        assert_eq!(a.bug_id, "BUG-HOMB-001");
        assert_eq!(b.bug_id, "BUG-HOMB-001");
        assert_ne!(a.id, b.id);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_sparse_update_leaves_other_columns() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let qa = db.user("Quinn", Role::Qa).await;
        db.project_with_id("project-u7p2", Some(&qa)).await;
        let created = create_issue(db.pool(), &new_issue("project-u7p2", "Crash"), &qa.id)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let update = SparseUpdate::new("issues").set("status", Some(IssueStatus::Fixed.as_str()));
        let updated = update_issue(db.pool(), &created.id, update, &qa.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "Fixed");
        assert_eq!(updated.severity, "Critical");
        assert_eq!(updated.title, "Crash");
        assert_eq!(updated.bug_id, created.bug_id);
        assert!(updated.updated_at > created.updated_at);

        let missing = update_issue(
            db.pool(),
            "issue-missing",
            SparseUpdate::new("issues").set("title", Some("x")),
            &qa.id,
        )
        .await
        .unwrap();
        assert!(missing.is_none());

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_deleting_a_project_removes_its_issues_and_comments() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let qa = db.user("Quinn", Role::Qa).await;
        db.project_with_id("project-d3l7", Some(&qa)).await;
        let created = create_issue(db.pool(), &new_issue("project-d3l7", "Gone"), &qa.id)
            .await
            .unwrap();
        comment::create_comment(db.pool(), &created.id, &qa.id, "repro attached")
            .await
            .unwrap();

        assert!(project::delete_project(db.pool(), "project-d3l7").await.unwrap());
        assert!(get_issue(db.pool(), &created.id).await.unwrap().is_none());
        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE issue_id = $1")
            .bind(&created.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(comments, 0);

        db.cleanup().await;
    }
}
