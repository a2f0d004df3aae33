//! User API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::password::hash_password;
use crate::api::auth::{AdminOnly, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::data::PostgresService;
use crate::data::postgres::repositories::user::{self, NewUser, UserFilter};
use crate::data::sparse::SparseUpdate;

use types::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserDto};

/// Shared state for Users API endpoints
#[derive(Clone)]
pub struct UsersApiState {
    pub database: Arc<PostgresService>,
}

/// Build Users API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = UsersApiState { database };

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

fn user_not_found(id: &str) -> ApiError {
    ApiError::not_found("USER_NOT_FOUND", format!("User not found: {}", id))
}

pub(crate) async fn hash_or_internal(password: &str) -> Result<String, ApiError> {
    hash_password(password).await.map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        ApiError::internal_detail("Failed to hash password", &e)
    })
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("role" = Option<String>, Query, description = "Filter by role"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("search" = Option<String>, Query, description = "Match name or email")
    ),
    responses(
        (status = 200, description = "Users with pagination metadata")
    )
)]
pub async fn list_users(
    State(state): State<UsersApiState>,
    _auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserDto>>, ApiError> {
    let filter = UserFilter {
        role: query.role,
        status: query.status,
        search: query.search.as_deref(),
    };

    let (users, total) = user::list_users(state.database.pool(), &filter, query.page, query.limit)
        .await
        .map_err(ApiError::from_data)?;

    let data = users.into_iter().map(UserDto::from).collect();
    Ok(Json(PaginatedResponse::new(
        data,
        query.page,
        query.limit,
        total,
    )))
}

/// Get a single user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<UsersApiState>,
    _auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<UserDto>, ApiError> {
    let row = user::get_user(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| user_not_found(&id))?;

    Ok(Json(UserDto::from(row)))
}

/// Create a user (Admin)
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserDto),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<UsersApiState>,
    _admin: RequireRole<AdminOnly>,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let password_hash = hash_or_internal(&body.password).await?;

    let row = user::create_user(
        state.database.pool(),
        NewUser {
            name: body.name.trim(),
            email: &body.email,
            password_hash: &password_hash,
            role: body.role,
            status: body.status,
            avatar: body.avatar.as_deref(),
        },
    )
    .await
    .map_err(ApiError::from_data)?;

    Ok((StatusCode::CREATED, Json(UserDto::from(row))))
}

/// Update a user
///
/// Admin may change any field. Other users may only change their own name,
/// avatar and password.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserDto),
        (status = 400, description = "No fields to update"),
        (status = 403, description = "Not allowed to change this user or field"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<UsersApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if !auth.is_admin() {
        if auth.user.id != id {
            return Err(ApiError::forbidden(
                "ACCESS_DENIED",
                "You can only update your own profile",
            ));
        }
        if body.touches_admin_fields() {
            return Err(ApiError::forbidden(
                "INSUFFICIENT_ROLE",
                "Only Admin can change email, role or status",
            ));
        }
    }

    let password_hash = match body.password.as_deref() {
        Some(password) => Some(hash_or_internal(password).await?),
        None => None,
    };

    let update = SparseUpdate::new("users")
        .set("name", body.name)
        .set("email", body.email.as_deref().map(user::normalize_email))
        .set("password", password_hash)
        .set("role", body.role.map(|r| r.as_str()))
        .set("status", body.status.map(|s| s.as_str()))
        .set_nullable("avatar", body.avatar);
    if update.is_empty() {
        return Err(ApiError::no_fields());
    }

    let row = user::update_user(state.database.pool(), &id, update)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| user_not_found(&id))?;

    Ok(Json(UserDto::from(row)))
}

/// Delete a user (Admin); an Admin cannot delete their own account
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<UsersApiState>,
    admin: RequireRole<AdminOnly>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    if admin.user.id == id {
        return Err(ApiError::bad_request(
            "CANNOT_DELETE_SELF",
            "You cannot delete your own account",
        ));
    }

    let deleted = user::delete_user(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(user_not_found(&id));
    }

    tracing::info!(user_id = %id, admin_id = %admin.user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
