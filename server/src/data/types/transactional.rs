//! Row types for the PostgreSQL tables
//!
//! Enumerated columns are kept as `String` here; request types carry the
//! typed enums and the table CHECK constraints guard what is stored.
//! Fields marked `#[sqlx(default)]` come from joins or aggregates and are
//! absent when a row is read back with `RETURNING *`.

use chrono::{DateTime, NaiveDate, Utc};

// ============================================================================
// User types
// ============================================================================

/// User row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub role: String,
    pub status: String,
    pub avatar: Option<String>,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Project types
// ============================================================================

/// Project row with issue counts for progress
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub total_issues: i64,
    #[sqlx(default)]
    pub completed_issues: i64,
}

/// Project member joined with the user record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberWithUser {
    pub project_id: String,
    pub user_id: String,
    /// Free-form label within the project (e.g. "Owner", "Tester")
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub user_role: String,
    pub avatar: Option<String>,
}

// ============================================================================
// Issue types
// ============================================================================

/// Issue row, optionally joined with people and comment counts
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueRow {
    pub id: String,
    pub bug_id: String,
    pub bug_seq: i32,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub module_name: Option<String>,
    pub issue_type: String,
    pub severity: String,
    pub status: String,
    pub priority: String,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub project_name: Option<String>,
    #[sqlx(default)]
    pub assignee_name: Option<String>,
    #[sqlx(default)]
    pub reporter_name: Option<String>,
    #[sqlx(default)]
    pub comment_count: i64,
}

/// Watcher joined with the user record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WatcherRow {
    pub issue_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Comment types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: String,
    pub issue_id: String,
    pub user_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub user_name: Option<String>,
    #[sqlx(default)]
    pub user_avatar: Option<String>,
}

// ============================================================================
// Planning types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SprintRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub issue_count: i64,
}

/// Epic row with issue counts for progress
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EpicRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub color: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub total_issues: i64,
    #[sqlx(default)]
    pub completed_issues: i64,
}

// ============================================================================
// Activity types
// ============================================================================

/// Append-only activity entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: String,
    pub project_id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub user_name: Option<String>,
}

// ============================================================================
// Reference data types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LabelRow {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueTypeRow {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Completion percentage rounded to the nearest integer, 0 when empty
pub fn progress_percent(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i32
}

/// Generate an application id of the form `<kind>-<cuid2>`
pub fn new_id(kind: &str) -> String {
    format!("{}-{}", kind, cuid2::create_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(4, 4), 100);
    }

    #[test]
    fn test_new_id_has_kind_prefix_and_is_unique() {
        let a = new_id("issue");
        let b = new_id("issue");
        assert!(a.starts_with("issue-"));
        assert!(a.len() > "issue-".len());
        assert_ne!(a, b);
    }
}
