//! Project API types

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{default_limit, default_page, double_option, validate_limit, validate_page};
use crate::data::types::{MemberWithUser, ProjectRow, ProjectStatus, progress_percent};

/// Default label for a member added without one
pub const DEFAULT_MEMBER_ROLE: &str = "Member";

/// Project member DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// Global role of the user
    pub user_role: String,
    /// Label within this project
    pub role: String,
    pub avatar: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<MemberWithUser> for MemberDto {
    fn from(row: MemberWithUser) -> Self {
        Self {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            user_role: row.user_role,
            role: row.role,
            avatar: row.avatar,
            joined_at: row.joined_at,
        }
    }
}

/// Project DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Percentage of issues that are Fixed or Closed
    pub progress: i32,
    pub total_issues: i64,
    pub completed_issues: i64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: Vec<MemberDto>,
}

impl ProjectDto {
    pub fn new(row: ProjectRow, members: Vec<MemberWithUser>) -> Self {
        Self {
            progress: progress_percent(row.completed_issues, row.total_issues),
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            total_issues: row.total_issues,
            completed_issues: row.completed_issues,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            members: members.into_iter().map(MemberDto::from).collect(),
        }
    }

    /// Attach members fetched for a whole page in one query
    pub fn with_grouped_members(rows: Vec<ProjectRow>, members: Vec<MemberWithUser>) -> Vec<Self> {
        let mut by_project: HashMap<String, Vec<MemberWithUser>> = HashMap::new();
        for member in members {
            by_project
                .entry(member.project_id.clone())
                .or_default()
                .push(member);
        }
        rows.into_iter()
            .map(|row| {
                let members = by_project.remove(&row.id).unwrap_or_default();
                Self::new(row, members)
            })
            .collect()
    }
}

/// Request body for creating a project
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: ProjectStatus,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Request body for updating a project; `null` clears nullable fields
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    pub status: Option<ProjectStatus>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,
}

/// Query params for listing projects
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    #[serde(default = "default_page")]
    #[validate(custom(function = "validate_page"))]
    pub page: u32,

    #[serde(default = "default_limit")]
    #[validate(custom(function = "validate_limit"))]
    pub limit: u32,

    pub status: Option<ProjectStatus>,

    #[validate(length(max = 100, message = "Search must be at most 100 characters"))]
    pub search: Option<String>,
}

/// Request body for adding a member
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[validate(length(min = 1, max = 128, message = "userId is required"))]
    pub user_id: String,

    #[validate(length(min = 1, max = 50, message = "Role must be 1-50 characters"))]
    pub role: Option<String>,
}
