//! Issue API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{default_limit, default_page, double_option, validate_limit, validate_page};
use crate::data::postgres::repositories::issue::NewIssue;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{IssueKind, IssueRow, IssueStatus, Priority, Severity, WatcherRow};

/// Issue DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueDto {
    pub id: String,
    pub bug_id: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub module_name: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: String,
    pub status: String,
    pub priority: String,
    pub assigned_to: Option<String>,
    pub assignee_name: Option<String>,
    pub reported_by: Option<String>,
    pub reporter_name: Option<String>,
    pub steps_to_reproduce: Option<String>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub environment: Option<String>,
    pub screenshots: Vec<String>,
    #[schema(value_type = Object)]
    pub related_links: serde_json::Value,
    pub labels: Vec<String>,
    pub epic_id: Option<String>,
    pub sprint_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IssueRow> for IssueDto {
    fn from(row: IssueRow) -> Self {
        Self {
            id: row.id,
            bug_id: row.bug_id,
            project_id: row.project_id,
            project_name: row.project_name,
            title: row.title,
            description: row.description,
            module_name: row.module_name,
            issue_type: row.issue_type,
            severity: row.severity,
            status: row.status,
            priority: row.priority,
            assigned_to: row.assigned_to,
            assignee_name: row.assignee_name,
            reported_by: row.reported_by,
            reporter_name: row.reporter_name,
            steps_to_reproduce: row.steps_to_reproduce,
            expected_result: row.expected_result,
            actual_result: row.actual_result,
            environment: row.environment,
            screenshots: row.screenshots,
            related_links: row.related_links,
            labels: row.labels,
            epic_id: row.epic_id,
            sprint_id: row.sprint_id,
            due_date: row.due_date,
            comment_count: row.comment_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Watcher DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatcherDto {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<WatcherRow> for WatcherDto {
    fn from(row: WatcherRow) -> Self {
        Self {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

/// Single issue with its watchers
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetailDto {
    #[serde(flatten)]
    pub issue: IssueDto,
    pub watchers: Vec<WatcherDto>,
}

fn empty_links() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

/// Request body for creating an issue (JSON, or the `data` part of a multipart body)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    #[validate(length(min = 1, max = 128, message = "projectId is required"))]
    pub project_id: String,

    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,

    pub description: Option<String>,
    pub module_name: Option<String>,

    #[serde(rename = "type", default)]
    pub issue_type: IssueKind,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub status: IssueStatus,

    #[serde(default)]
    pub priority: Priority,

    pub assigned_to: Option<String>,
    pub steps_to_reproduce: Option<String>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub environment: Option<String>,

    #[serde(default)]
    pub screenshots: Vec<String>,

    #[serde(default = "empty_links")]
    #[schema(value_type = Object)]
    pub related_links: serde_json::Value,

    #[serde(default)]
    pub labels: Vec<String>,

    pub epic_id: Option<String>,
    pub sprint_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl CreateIssueRequest {
    /// Insert fields; stored attachment paths are appended to the screenshots
    pub fn into_new_issue(self, reported_by: &str, stored: Vec<String>) -> NewIssue {
        let mut screenshots = self.screenshots;
        screenshots.extend(stored);

        NewIssue {
            project_id: self.project_id,
            title: self.title.trim().to_string(),
            description: self.description,
            module_name: self.module_name,
            issue_type: self.issue_type,
            severity: self.severity,
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to,
            reported_by: Some(reported_by.to_string()),
            steps_to_reproduce: self.steps_to_reproduce,
            expected_result: self.expected_result,
            actual_result: self.actual_result,
            environment: self.environment,
            screenshots,
            related_links: self.related_links,
            labels: self.labels,
            epic_id: self.epic_id,
            sprint_id: self.sprint_id,
            due_date: self.due_date,
        }
    }
}

/// Request body for updating an issue; `null` clears nullable fields
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub module_name: Option<Option<String>>,

    #[serde(rename = "type")]
    pub issue_type: Option<IssueKind>,

    pub severity: Option<Severity>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub steps_to_reproduce: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub expected_result: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub actual_result: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub environment: Option<Option<String>>,

    /// Replaces the screenshot list; new attachments are appended to it
    pub screenshots: Option<Vec<String>>,

    #[schema(value_type = Option<Object>)]
    pub related_links: Option<serde_json::Value>,

    pub labels: Option<Vec<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub epic_id: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub sprint_id: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateIssueRequest {
    /// Map supplied fields onto issue columns
    ///
    /// `screenshots` is the final list when the request or its attachments
    /// change it.
    pub fn into_update(self, screenshots: Option<Vec<String>>) -> SparseUpdate {
        SparseUpdate::new("issues")
            .set("title", self.title.map(|t| t.trim().to_string()))
            .set_nullable("description", self.description)
            .set_nullable("module_name", self.module_name)
            .set("issue_type", self.issue_type.map(|v| v.as_str()))
            .set("severity", self.severity.map(|v| v.as_str()))
            .set("status", self.status.map(|v| v.as_str()))
            .set("priority", self.priority.map(|v| v.as_str()))
            .set_nullable("assigned_to", self.assigned_to)
            .set_nullable("steps_to_reproduce", self.steps_to_reproduce)
            .set_nullable("expected_result", self.expected_result)
            .set_nullable("actual_result", self.actual_result)
            .set_nullable("environment", self.environment)
            .set("screenshots", screenshots)
            .set("related_links", self.related_links)
            .set("labels", self.labels)
            .set_nullable("epic_id", self.epic_id)
            .set_nullable("sprint_id", self.sprint_id)
            .set_nullable("due_date", self.due_date)
    }
}

/// Query params for listing issues
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListIssuesQuery {
    #[serde(default = "default_page")]
    #[validate(custom(function = "validate_page"))]
    pub page: u32,

    #[serde(default = "default_limit")]
    #[validate(custom(function = "validate_limit"))]
    pub limit: u32,

    pub project_id: Option<String>,
    pub status: Option<IssueStatus>,
    pub severity: Option<Severity>,
    pub priority: Option<Priority>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueKind>,
    pub assigned_to: Option<String>,
    pub reported_by: Option<String>,
    pub sprint_id: Option<String>,
    pub epic_id: Option<String>,
    pub label: Option<String>,

    #[validate(length(max = 100, message = "Search must be at most 100 characters"))]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults() {
        let body: CreateIssueRequest =
            serde_json::from_str(r#"{"projectId":"project-abc","title":"Crash on save"}"#).unwrap();
        assert_eq!(body.issue_type, IssueKind::Bug);
        assert_eq!(body.status, IssueStatus::Open);
        assert_eq!(body.priority, Priority::P3);
        assert_eq!(body.related_links, serde_json::json!([]));

        let issue = body.into_new_issue("user-1", vec!["/uploads/a.png".to_string()]);
        assert_eq!(issue.reported_by.as_deref(), Some("user-1"));
        assert_eq!(issue.screenshots, vec!["/uploads/a.png"]);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = serde_json::from_str::<UpdateIssueRequest>(r#"{"status":"Testing"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_maps_only_supplied_fields() {
        let body: UpdateIssueRequest = serde_json::from_str(
            r#"{"status":"Fixed","assignedTo":null,"type":"Task"}"#,
        )
        .unwrap();
        let update = body.into_update(None);
        assert_eq!(update.columns(), vec!["issue_type", "status", "assigned_to"]);
    }

    #[test]
    fn test_update_trims_title() {
        let body: UpdateIssueRequest =
            serde_json::from_str(r#"{"title":"  Crash on save  "}"#).unwrap();
        let update = body.into_update(None);
        assert_eq!(
            update.value("title"),
            Some(&crate::data::sparse::SqlValue::Text(Some("Crash on save".to_string())))
        );
    }

    #[test]
    fn test_empty_update_has_no_columns() {
        let update = UpdateIssueRequest::default().into_update(None);
        assert!(update.is_empty());
    }

    #[test]
    fn test_detail_flattens_issue_fields() {
        let row = IssueRow {
            id: "issue-1".to_string(),
            bug_id: "BUG-ABCD-001".to_string(),
            bug_seq: 1,
            project_id: "project-abcd".to_string(),
            title: "Crash".to_string(),
            description: None,
            module_name: None,
            issue_type: "Bug".to_string(),
            severity: "High".to_string(),
            status: "Open".to_string(),
            priority: "P1".to_string(),
            assigned_to: None,
            reported_by: None,
            steps_to_reproduce: None,
            expected_result: None,
            actual_result: None,
            environment: None,
            screenshots: Vec::new(),
            related_links: serde_json::json!([]),
            labels: Vec::new(),
            epic_id: None,
            sprint_id: None,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            project_name: None,
            assignee_name: None,
            reporter_name: None,
            comment_count: 3,
        };
        let detail = IssueDetailDto {
            issue: IssueDto::from(row),
            watchers: Vec::new(),
        };
        let json = serde_json::to_value(detail).unwrap();
        assert_eq!(json["bugId"], "BUG-ABCD-001");
        assert_eq!(json["type"], "Bug");
        assert_eq!(json["commentCount"], 3);
        assert!(json["watchers"].as_array().unwrap().is_empty());
    }
}
