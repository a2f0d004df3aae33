//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::context::{AuthService, AuthUser};
use super::jwt::JwtError;
use super::manager::AuthManager;
use crate::data::PostgresService;

/// Authentication error response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn required() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "AUTH_REQUIRED",
            message: "Access token required".to_string(),
        }
    }

    pub fn expired() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_EXPIRED",
            message: "Token has expired".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_INVALID",
            message: "Invalid token".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth_manager: Arc<AuthManager>,
    pub database: Arc<PostgresService>,
}

/// Token from an `Authorization: Bearer <token>` header
///
/// `Ok(None)` when the header is absent; `Err` when it is present but not a
/// usable bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::invalid())?;
    let (scheme, token) = value.split_once(' ').ok_or_else(AuthError::invalid)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::invalid());
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::required());
    }
    Ok(Some(token))
}

/// Authentication middleware
///
/// Injects into request extensions:
/// - `AuthUser` - the caller's identity from the token
/// - `Arc<AuthService>` - project authorization checks
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?.ok_or_else(AuthError::required)?;

    let claims = state
        .auth_manager
        .validate_token(token)
        .map_err(|e| match e {
            JwtError::Expired => AuthError::expired(),
            other => {
                tracing::debug!(error = %other, "Rejected bearer token");
                AuthError::invalid()
            }
        })?;

    let user = AuthUser::from_claims(claims).ok_or_else(AuthError::invalid)?;

    let auth_service = Arc::new(AuthService::new(state.database.pool().clone()));
    request.extensions_mut().insert(auth_service);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::extract::Extension;
    use axum::routing::get;
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        format!("{}:{}", user.id, user.role)
    }

    fn app(manager: Arc<AuthManager>) -> Router {
        let state = AuthState {
            auth_manager: manager,
            database: Arc::new(PostgresService::lazy_for_test()),
        };
        Router::new()
            .route("/me", get(whoami))
            .layer(axum::middleware::from_fn_with_state(state, require_auth))
    }

    fn request(auth: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn code_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["code"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let response = app(Arc::new(AuthManager::for_test()))
            .oneshot(request(None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(code_of(response).await, "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn test_malformed_header_is_401() {
        let response = app(Arc::new(AuthManager::for_test()))
            .oneshot(request(Some("Basic dXNlcjpwYXNz")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(code_of(response).await, "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn test_expired_token_is_401() {
        let manager = Arc::new(AuthManager::for_test());
        let token = manager.expired_token_for("user-1", "QA");
        let response = app(manager)
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(code_of(response).await, "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_foreign_signature_is_401() {
        let other = AuthManager::init(&Default::default(), false).unwrap();
        let token = other.token_for("user-1", "Admin");
        let response = app(Arc::new(AuthManager::for_test()))
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(code_of(response).await, "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let manager = Arc::new(AuthManager::for_test());
        let token = manager.token_for("user-7", "Developer");
        let response = app(manager)
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"user-7:Developer");
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Ok(None)));

        headers.insert(header::AUTHORIZATION, "bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, "Bearer".parse().unwrap());
        assert!(bearer_token(&headers).is_err());
    }
}
