//! Comment API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::data::types::CommentRow;

/// Comment DTO with author details
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: String,
    pub issue_id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRow> for CommentDto {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            issue_id: row.issue_id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_avatar: row.user_avatar,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 128, message = "issueId is required"))]
    pub issue_id: String,

    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

/// Author or Admin may edit or delete a comment
pub fn can_modify_comment(author_id: Option<&str>, user_id: &str, is_admin: bool) -> bool {
    is_admin || author_id == Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_modify_comment() {
        assert!(can_modify_comment(Some("user-1"), "user-1", false));
        assert!(!can_modify_comment(Some("user-1"), "user-2", false));
        assert!(can_modify_comment(Some("user-1"), "user-2", true));
        assert!(!can_modify_comment(None, "user-2", false));
        assert!(can_modify_comment(None, "user-2", true));
    }

    #[test]
    fn test_empty_content_rejected() {
        let body: CreateCommentRequest =
            serde_json::from_str(r#"{"issueId":"issue-1","content":""}"#).unwrap();
        assert!(body.validate().is_err());
    }
}
