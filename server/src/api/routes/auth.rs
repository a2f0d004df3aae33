//! Authentication API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::password::{LoginRejection, check_login, verify_password};
use crate::api::auth::{Auth, AuthManager, AuthState, require_auth};
use crate::api::extractors::ValidatedJson;
use crate::api::routes::users::hash_or_internal;
use crate::api::routes::users::types::{UserDto, validate_password};
use crate::api::types::ApiError;
use crate::data::PostgresService;
use crate::data::postgres::repositories::user::{self, NewUser};
use crate::data::types::{Role, UserStatus};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(custom(function = "validate_password"))]
    pub password: String,

    /// Defaults to Developer; Admin accounts cannot be self-registered
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserDto,
}

/// Auth state with database access
#[derive(Clone)]
pub struct AuthRoutesState {
    pub auth_manager: Arc<AuthManager>,
    pub database: Arc<PostgresService>,
}

/// Create auth routes; `/me` sits behind bearer authentication
pub fn routes(auth_manager: Arc<AuthManager>, database: Arc<PostgresService>) -> Router {
    let auth_state = AuthState {
        auth_manager: auth_manager.clone(),
        database: database.clone(),
    };
    let state = AuthRoutesState {
        auth_manager,
        database,
    };

    let me = Router::new()
        .route("/me", get(current_user))
        .route_layer(axum::middleware::from_fn_with_state(auth_state, require_auth));

    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .merge(me)
        .with_state(state)
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("INVALID_CREDENTIALS", "Invalid credentials")
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AuthRoutesState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let pool = state.database.pool();

    let found = user::get_user_by_email(pool, request.email.trim())
        .await
        .map_err(ApiError::from_data)?;

    let password_matches = match &found {
        Some(u) => verify_password(&request.password, &u.password).await,
        None => false,
    };

    match check_login(found.as_ref(), password_matches) {
        Ok(()) => {}
        Err(LoginRejection::InvalidCredentials) => {
            tracing::debug!("Login rejected: invalid credentials");
            return Err(invalid_credentials());
        }
        Err(LoginRejection::Inactive) => {
            return Err(ApiError::forbidden(
                "ACCOUNT_INACTIVE",
                "Account is inactive. Please contact an administrator",
            ));
        }
    }

    let Some(user_row) = found else {
        return Err(invalid_credentials());
    };

    let token = state.auth_manager.issue_token(&user_row).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign token");
        ApiError::internal_detail("Failed to issue token", &e)
    })?;

    if let Err(e) = user::touch_last_active(pool, &user_row.id).await {
        tracing::warn!(error = %e, user_id = %user_row.id, "Failed to record last activity");
    }

    tracing::info!(user_id = %user_row.id, "User logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserDto::from(user_row),
    }))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Admin role requested"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AuthRoutesState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if request.role == Role::Admin {
        tracing::warn!("Rejected self-registration as Admin");
        return Err(ApiError::forbidden(
            "ADMIN_REGISTRATION_FORBIDDEN",
            "Admin accounts are created by an administrator",
        ));
    }

    let password_hash = hash_or_internal(&request.password).await?;

    let row = user::create_user(
        state.database.pool(),
        NewUser {
            name: request.name.trim(),
            email: &request.email,
            password_hash: &password_hash,
            role: request.role,
            status: UserStatus::Active,
            avatar: None,
        },
    )
    .await
    .map_err(ApiError::from_data)?;

    tracing::info!(user_id = %row.id, role = %row.role, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserDto::from(row),
        }),
    ))
}

/// Current user's record
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated user", body = UserDto),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn current_user(
    State(state): State<AuthRoutesState>,
    auth: Auth,
) -> Result<Json<UserDto>, ApiError> {
    let row = user::get_user(state.database.pool(), &auth.user.id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserDto::from(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        routes(
            Arc::new(AuthManager::for_test()),
            Arc::new(PostgresService::lazy_for_test()),
        )
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let response = app()
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_missing_fields_is_400() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email":"a@example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_empty_password_is_400() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email":"a@example.com","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_as_admin_is_403() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name":"Mallory","email":"m@example.com","password":"secret1","role":"Admin"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_register_role_defaults_to_developer() {
        let body: RegisterRequest =
            serde_json::from_str(r#"{"name":"Ann","email":"ann@example.com","password":"secret1"}"#)
                .unwrap();
        assert_eq!(body.role, Role::Developer);
        assert!(body.validate().is_ok());
    }
}
