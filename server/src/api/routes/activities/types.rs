//! Activity API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core::constants::DEFAULT_ACTIVITY_LIMIT;
use crate::data::types::ActivityRow;

/// Activity DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub id: String,
    pub project_id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityRow> for ActivityDto {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            user_name: row.user_name,
            action: row.action,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

fn default_activity_limit() -> u32 {
    DEFAULT_ACTIVITY_LIMIT
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListActivitiesQuery {
    #[serde(default = "default_activity_limit")]
    #[validate(range(min = 1, max = 500, message = "Limit must be between 1 and 500"))]
    pub limit: u32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    #[validate(length(min = 1, max = 128, message = "projectId is required"))]
    pub project_id: String,

    #[validate(length(min = 1, max = 100, message = "Action must be 1-100 characters"))]
    pub action: String,

    #[validate(length(max = 2000, message = "Details must be at most 2000 characters"))]
    pub details: Option<String>,
}
