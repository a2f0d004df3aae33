//! User API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::types::{default_limit, default_page, double_option, validate_limit, validate_page};
use crate::core::constants::MIN_PASSWORD_LEN;
use crate::data::types::{Role, UserRow, UserStatus};

/// User DTO for API responses; the password hash is never included
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub avatar: Option<String>,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            status: row.status,
            avatar: row.avatar,
            last_active: row.last_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Password length check shared by registration and user management
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if (password.chars().count() as u64) < MIN_PASSWORD_LEN {
        return Err(ValidationError::new("password_length").with_message(
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN).into(),
        ));
    }
    Ok(())
}

/// Request body for creating a user (Admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(custom(function = "validate_password"))]
    pub password: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub status: UserStatus,

    pub avatar: Option<String>,
}

/// Request body for updating a user; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_password"))]
    pub password: Option<String>,

    pub role: Option<Role>,

    pub status: Option<UserStatus>,

    /// `null` clears the avatar
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub avatar: Option<Option<String>>,
}

impl UpdateUserRequest {
    /// Fields only an Admin may change
    pub fn touches_admin_fields(&self) -> bool {
        self.email.is_some() || self.role.is_some() || self.status.is_some()
    }
}

/// Query params for listing users
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    #[validate(custom(function = "validate_page"))]
    pub page: u32,

    #[serde(default = "default_limit")]
    #[validate(custom(function = "validate_limit"))]
    pub limit: u32,

    pub role: Option<Role>,
    pub status: Option<UserStatus>,

    #[validate(length(max = 100, message = "Search must be at most 100 characters"))]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_dto_omits_password() {
        let row = UserRow {
            id: "user-1".to_string(),
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            password: "$2b$10$hash".to_string(),
            role: "QA".to_string(),
            status: "Active".to_string(),
            avatar: None,
            last_active: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(UserDto::from(row)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "QA");
        assert!(json.get("lastActive").is_some());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let absent: UpdateUserRequest = serde_json::from_str(r#"{"name":"Dana"}"#).unwrap();
        assert_eq!(absent.avatar, None);

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(cleared.avatar, Some(None));
    }

    #[test]
    fn test_self_service_fields() {
        let own: UpdateUserRequest =
            serde_json::from_str(r#"{"name":"Dana","password":"secret1"}"#).unwrap();
        assert!(!own.touches_admin_fields());

        let promote: UpdateUserRequest = serde_json::from_str(r#"{"role":"Admin"}"#).unwrap();
        assert!(promote.touches_admin_fields());
    }

    #[test]
    fn test_short_password_rejected() {
        let body: UpdateUserRequest = serde_json::from_str(r#"{"password":"abc"}"#).unwrap();
        assert!(body.validate().is_err());
    }
}
