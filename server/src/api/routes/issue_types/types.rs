//! Issue type API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{double_option, validate_color};
use crate::data::sparse::SparseUpdate;
use crate::data::types::IssueTypeRow;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueTypeDto {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IssueTypeRow> for IssueTypeDto {
    fn from(row: IssueTypeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            icon: row.icon,
            color: row.color,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIssueTypeRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "Icon must be at most 50 characters"))]
    pub icon: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateIssueTypeRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub icon: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl UpdateIssueTypeRequest {
    pub fn into_update(self) -> SparseUpdate {
        SparseUpdate::new("issue_types")
            .set("name", self.name.map(|n| n.trim().to_string()))
            .set_nullable("icon", self.icon)
            .set_nullable("color", self.color)
            .set_nullable("description", self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validation() {
        let ok: CreateIssueTypeRequest =
            serde_json::from_str(r##"{"name":"Spike","icon":"zap","color":"#f59e0b"}"##).unwrap();
        assert!(ok.validate().is_ok());

        let bad: CreateIssueTypeRequest =
            serde_json::from_str(r#"{"name":"Spike","color":"orange"}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_update_fields() {
        assert!(UpdateIssueTypeRequest::default().into_update().is_empty());

        let body: UpdateIssueTypeRequest =
            serde_json::from_str(r#"{"name":" Spike ","icon":null}"#).unwrap();
        let update = body.into_update();
        assert_eq!(update.columns(), vec!["name", "icon"]);
    }
}
