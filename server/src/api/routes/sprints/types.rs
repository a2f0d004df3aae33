//! Sprint API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::types::{ApiError, double_option};
use crate::data::sparse::SparseUpdate;
use crate::data::types::{SprintRow, SprintStatus};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SprintDto {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub issue_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SprintRow> for SprintDto {
    fn from(row: SprintRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            goal: row.goal,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status,
            issue_count: row.issue_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Query params for sprint and epic listings
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScopeQuery {
    #[validate(length(min = 1, max = 128, message = "projectId must be 1-128 characters"))]
    pub project_id: Option<String>,
}

/// An end date may not precede the start date
pub fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            let mut err = ValidationError::new("date_range");
            err.message = Some("End date must not be before start date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Check the range a sparse update leaves behind: sent dates override the
/// stored ones, an explicit `null` clears them
pub fn check_updated_date_range(
    stored_start: Option<NaiveDate>,
    stored_end: Option<NaiveDate>,
    start: Option<Option<NaiveDate>>,
    end: Option<Option<NaiveDate>>,
) -> Result<(), ApiError> {
    check_date_range(start.unwrap_or(stored_start), end.unwrap_or(stored_end)).map_err(|_| {
        ApiError::bad_request("VALIDATION_ERROR", "End date must not be before start date")
    })
}

fn validate_create_dates(body: &CreateSprintRequest) -> Result<(), ValidationError> {
    check_date_range(body.start_date, body.end_date)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateSprintRequest {
    #[validate(length(min = 1, max = 128, message = "projectId is required"))]
    pub project_id: String,

    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub status: SprintStatus,
}

/// Sparse sprint update; `null` clears nullable fields
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSprintRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub goal: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,

    pub status: Option<SprintStatus>,
}

impl UpdateSprintRequest {
    pub fn into_update(self) -> SparseUpdate {
        SparseUpdate::new("sprints")
            .set("name", self.name)
            .set_nullable("goal", self.goal)
            .set_nullable("start_date", self.start_date)
            .set_nullable("end_date", self.end_date)
            .set("status", self.status.map(|s| s.as_str()))
    }
}
