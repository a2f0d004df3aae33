//! Path and validation extractors for API routes

use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Maximum length for resource IDs in paths
pub const MAX_ID_LENGTH: usize = 128;

/// Validate a resource id: 1-128 chars, alphanumeric + dash/underscore
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Deserialize)]
struct IdPathRaw {
    id: String,
}

/// Validated `{id}` path extractor
#[derive(Debug)]
pub struct IdPath {
    pub id: String,
}

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<IdPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&raw.id) {
            return Err(ValidationRejection::InvalidId("id"));
        }

        Ok(Self { id: raw.id })
    }
}

#[derive(Debug, Deserialize)]
struct UserSubPathRaw {
    id: String,
    user_id: String,
}

/// Validated `{id}/.../{user_id}` path extractor (members, watchers)
#[derive(Debug)]
pub struct UserSubPath {
    pub id: String,
    pub user_id: String,
}

impl<S> FromRequestParts<S> for UserSubPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<UserSubPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&raw.id) {
            return Err(ValidationRejection::InvalidId("id"));
        }
        if !is_valid_id(&raw.user_id) {
            return Err(ValidationRejection::InvalidId("user_id"));
        }

        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
        })
    }
}

/// Validation rejection with structured error response
#[derive(Debug)]
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Path parameter with an invalid id format
    InvalidId(&'static str),
    /// Failed to parse query string
    Query(QueryRejection),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::Path(rejection) => ("PATH_PARSE_ERROR", rejection.body_text()),
            Self::InvalidId(param) => (
                "INVALID_ID",
                format!(
                    "Invalid {}: must be 1-{} alphanumeric chars, dashes, or underscores",
                    param, MAX_ID_LENGTH
                ),
            ),
            Self::Query(rejection) => ("QUERY_PARSE_ERROR", rejection.body_text()),
            Self::Json(rejection) => ("JSON_PARSE_ERROR", rejection.body_text()),
            Self::Validation(errors) => ("VALIDATION_ERROR", format_validation_errors(&errors)),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "bad_request",
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

pub(crate) fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Query extractor with automatic validation.
///
/// Deserializes query parameters and validates them using the `validator` crate.
/// Returns a `ValidationRejection` on parse or validation failure.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Query)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

/// JSON body extractor with automatic validation.
///
/// Deserializes JSON body and validates it using the `validator` crate.
/// Returns a `ValidationRejection` on parse or validation failure.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("issue-tz4a98xxat96iws9zmbrgj3a"));
        assert!(is_valid_id("issuetype-bug"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../etc"));
        assert!(!is_valid_id("a b"));
        assert!(!is_valid_id(&"x".repeat(MAX_ID_LENGTH + 1)));
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Body {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[tokio::test]
    async fn test_validated_json_rejects_invalid_body() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"name": ""}"#))
            .unwrap();

        let err = ValidatedJson::<Body>::from_request(req, &()).await.unwrap_err();
        match err {
            ValidationRejection::Validation(errors) => {
                assert_eq!(format_validation_errors(&errors), "Name is required")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"name": "Apollo"}"#))
            .unwrap();

        let ValidatedJson(body) = ValidatedJson::<Body>::from_request(req, &()).await.unwrap();
        assert_eq!(body.name, "Apollo");
    }
}
