//! Epic API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::routes::sprints::types::check_date_range;
use crate::api::types::{double_option, validate_color};
use crate::data::sparse::SparseUpdate;
use crate::data::types::{EpicRow, EpicStatus, progress_percent};

/// Epic DTO; progress derives from the epic's issues
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EpicDto {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub color: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Percentage of linked issues that are Fixed or Closed
    pub progress: i32,
    pub total_issues: i64,
    pub completed_issues: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EpicRow> for EpicDto {
    fn from(row: EpicRow) -> Self {
        Self {
            progress: progress_percent(row.completed_issues, row.total_issues),
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            description: row.description,
            status: row.status,
            color: row.color,
            start_date: row.start_date,
            end_date: row.end_date,
            total_issues: row.total_issues,
            completed_issues: row.completed_issues,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn validate_create_dates(body: &CreateEpicRequest) -> Result<(), ValidationError> {
    check_date_range(body.start_date, body.end_date)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateEpicRequest {
    #[validate(length(min = 1, max = 128, message = "projectId is required"))]
    pub project_id: String,

    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: EpicStatus,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEpicRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    pub status: Option<EpicStatus>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,
}

impl UpdateEpicRequest {
    pub fn into_update(self) -> SparseUpdate {
        SparseUpdate::new("epics")
            .set("name", self.name)
            .set_nullable("description", self.description)
            .set("status", self.status.map(|s| s.as_str()))
            .set_nullable("color", self.color)
            .set_nullable("start_date", self.start_date)
            .set_nullable("end_date", self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(completed: i64, total: i64) -> EpicRow {
        EpicRow {
            id: "epic-1".to_string(),
            project_id: "project-1".to_string(),
            name: "Checkout".to_string(),
            description: None,
            status: "In Progress".to_string(),
            color: Some("#1f6feb".to_string()),
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            total_issues: total,
            completed_issues: completed,
        }
    }

    #[test]
    fn test_progress_is_derived() {
        assert_eq!(EpicDto::from(row(1, 4)).progress, 25);
        assert_eq!(EpicDto::from(row(0, 0)).progress, 0);
    }

    #[test]
    fn test_status_serializes_with_space() {
        let body: CreateEpicRequest = serde_json::from_str(
            r#"{"projectId":"project-1","name":"Checkout","status":"In Progress"}"#,
        )
        .unwrap();
        assert_eq!(body.status, EpicStatus::InProgress);
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_create_rejects_bad_color() {
        let body: CreateEpicRequest =
            serde_json::from_str(r#"{"projectId":"project-1","name":"Checkout","color":"red"}"#)
                .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_clearing_color_is_an_update() {
        let body: UpdateEpicRequest = serde_json::from_str(r#"{"color":null}"#).unwrap();
        assert!(!body.into_update().is_empty());
    }
}
