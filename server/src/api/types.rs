//! Shared API types
//!
//! Common types used across all API endpoints including error handling
//! and pagination.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::ValidationError;

use crate::data::DataError;
use crate::data::files::UploadError;

/// Maximum items per page for paginated endpoints
pub const MAX_PAGE_LIMIT: u32 = 200;
/// Maximum page number to prevent expensive OFFSET queries
pub const MAX_PAGE: u32 = 1000;
/// Default page number
pub const DEFAULT_PAGE: u32 = 1;
/// Default items per page
pub const DEFAULT_LIMIT: u32 = 50;

/// Whether internal error details are included in responses (off in production)
static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(true);

/// Configure internal error detail exposure; called once at startup
pub fn set_expose_error_details(expose: bool) {
    EXPOSE_ERROR_DETAILS.store(expose, Ordering::Relaxed);
}

/// Validator function for page parameter
pub fn validate_page(page: u32) -> Result<(), ValidationError> {
    if page < 1 {
        return Err(ValidationError::new("page_min").with_message("Page must be >= 1".into()));
    }
    if page > MAX_PAGE {
        return Err(ValidationError::new("page_max").with_message(
            format!("Page must be <= {} to prevent expensive queries", MAX_PAGE).into(),
        ));
    }
    Ok(())
}

/// Validator function for limit parameter
pub fn validate_limit(limit: u32) -> Result<(), ValidationError> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::new("limit_range")
            .with_message(format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT).into()));
    }
    Ok(())
}

/// Validator function for `#rgb` / `#rrggbb` colors
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or_default();
    if (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }
    Err(ValidationError::new("color")
        .with_message("Color must be a hex value like #1f6feb".into()))
}

/// Check a three-state color field; validator cannot see through the double option
pub fn check_nullable_color(color: &Option<Option<String>>) -> Result<(), ApiError> {
    match color {
        Some(Some(c)) => validate_color(c).map_err(|e| {
            ApiError::bad_request(
                "VALIDATION_ERROR",
                e.message.map(|m| m.to_string()).unwrap_or_default(),
            )
        }),
        _ => Ok(()),
    }
}

/// Deserialize a field that distinguishes absent (`None`), `null`
/// (`Some(None)`) and a value (`Some(Some(v))`). Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    Conflict { code: String, message: String },
    TooManyRequests { message: String, retry_after_secs: u64 },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        Self::TooManyRequests {
            message: "Too many requests, please try again later".to_string(),
            retry_after_secs,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 400 for a sparse update that named no known fields
    pub fn no_fields() -> Self {
        Self::bad_request("NO_FIELDS", "No fields to update")
    }

    pub fn from_data(e: DataError) -> Self {
        match e {
            DataError::Conflict(constraint) => {
                tracing::debug!(%constraint, "Unique constraint violated");
                Self::conflict("CONFLICT", conflict_message(&constraint))
            }
            DataError::InvalidReference(constraint) => {
                tracing::debug!(%constraint, "Reference constraint violated");
                Self::bad_request(
                    "INVALID_REFERENCE",
                    format!("Invalid reference or value ({})", constraint),
                )
            }
            DataError::EmptyUpdate => Self::no_fields(),
            other => {
                tracing::error!(error = %other, "Data error");
                Self::internal_detail("Database operation failed", &other)
            }
        }
    }

    /// Internal error whose detail is only shown outside production
    pub fn internal_detail(message: &str, detail: &dyn std::fmt::Display) -> Self {
        if EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed) {
            Self::internal(format!("{}: {}", message, detail))
        } else {
            Self::internal(message)
        }
    }

    pub fn from_upload(e: UploadError) -> Self {
        match e {
            UploadError::TooMany { .. } => Self::bad_request("TOO_MANY_FILES", e.to_string()),
            UploadError::TooLarge { .. } => Self::bad_request("FILE_TOO_LARGE", e.to_string()),
            UploadError::Storage(inner) => {
                tracing::error!(error = %inner, "Attachment storage error");
                Self::internal_detail("Failed to store attachment", &inner)
            }
        }
    }
}

fn conflict_message(constraint: &str) -> String {
    use crate::data::postgres::schema::{
        BUG_ID_CONSTRAINTS, ISSUE_TYPES_NAME_UNIQUE, LABELS_NAME_UNIQUE, USERS_EMAIL_UNIQUE,
    };

    match constraint {
        USERS_EMAIL_UNIQUE => "User with this email already exists".to_string(),
        LABELS_NAME_UNIQUE => "Label with this name already exists".to_string(),
        ISSUE_TYPES_NAME_UNIQUE => "Issue type with this name already exists".to_string(),
        c if BUG_ID_CONSTRAINTS.contains(&c) => {
            "Could not allocate a bug id, please retry".to_string()
        }
        _ => "Resource already exists".to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message)
            }
            Self::Conflict { code, message } => (StatusCode::CONFLICT, "conflict", code, message),
            Self::TooManyRequests {
                message,
                retry_after_secs,
            } => {
                retry_after = Some(retry_after_secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "too_many_requests",
                    "RATE_LIMITED".to_string(),
                    message,
                )
            }
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        let mut response = (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub fn default_page() -> u32 {
    DEFAULT_PAGE
}

pub fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Pagination metadata in response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        Self {
            page,
            limit,
            total_items,
            total_pages: total_items.div_ceil(limit.max(1) as u64),
        }
    }
}

/// Generic paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u32, limit: u32, total_items: u64) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(page, limit, total_items),
        }
    }
}

/// Body of simple acknowledgement responses
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::not_found("PROJECT_NOT_FOUND", "Project not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["code"], "PROJECT_NOT_FOUND");
        assert_eq!(body["message"], "Project not found");
    }

    #[tokio::test]
    async fn test_too_many_requests_sets_retry_after() {
        let response = ApiError::too_many_requests(42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_from_data_maps_constraints() {
        let err = ApiError::from_data(DataError::Conflict("users_email_unique".to_string()));
        match err {
            ApiError::Conflict { message, .. } => {
                assert_eq!(message, "User with this email already exists")
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(matches!(
            ApiError::from_data(DataError::InvalidReference("issues_sprint_id_fkey".into())),
            ApiError::BadRequest { .. }
        ));
        match ApiError::from_data(DataError::EmptyUpdate) {
            ApiError::BadRequest { message, .. } => assert_eq!(message, "No fields to update"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(2, 20, 41);
        assert_eq!(meta.total_pages, 3);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["totalItems"], 41);
        assert_eq!(json["totalPages"], 3);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        assigned_to: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_three_states() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.assigned_to, None);

        let null: Patch = serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(null.assigned_to, Some(None));

        let set: Patch = serde_json::from_str(r#"{"assigned_to": "user-1"}"#).unwrap();
        assert_eq!(set.assigned_to, Some(Some("user-1".to_string())));
    }

    #[test]
    fn test_validate_page_and_limit() {
        assert!(validate_page(0).is_err());
        assert!(validate_page(1).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(MAX_PAGE_LIMIT + 1).is_err());
        assert!(validate_limit(DEFAULT_LIMIT).is_ok());
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#fff").is_ok());
        assert!(validate_color("#1F6FEB").is_ok());
        assert!(validate_color("1f6feb").is_err());
        assert!(validate_color("#12345").is_err());
        assert!(validate_color("#gggggg").is_err());

        assert!(check_nullable_color(&None).is_ok());
        assert!(check_nullable_color(&Some(None)).is_ok());
        assert!(check_nullable_color(&Some(Some("red".to_string()))).is_err());
    }
}
