//! Issue type endpoints (global reference data)

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::{AdminOnly, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::types::{ApiError, check_nullable_color};
use crate::data::PostgresService;
use crate::data::postgres::repositories::issue_type::{self, NewIssueType};

use types::{CreateIssueTypeRequest, IssueTypeDto, UpdateIssueTypeRequest};

#[derive(Clone)]
pub struct IssueTypesApiState {
    pub database: Arc<PostgresService>,
}

/// Build Issue Types API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = IssueTypesApiState { database };

    Router::new()
        .route("/", get(list_issue_types).post(create_issue_type))
        .route(
            "/{id}",
            get(get_issue_type)
                .put(update_issue_type)
                .delete(delete_issue_type),
        )
        .with_state(state)
}

fn issue_type_not_found(id: &str) -> ApiError {
    ApiError::not_found(
        "ISSUE_TYPE_NOT_FOUND",
        format!("Issue type not found: {}", id),
    )
}

#[utoipa::path(
    get,
    path = "/api/issue-types",
    tag = "issue-types",
    responses((status = 200, description = "Issue types", body = Vec<IssueTypeDto>))
)]
pub async fn list_issue_types(
    State(state): State<IssueTypesApiState>,
    _auth: Auth,
) -> Result<Json<Vec<IssueTypeDto>>, ApiError> {
    let rows = issue_type::list_issue_types(state.database.pool())
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows.into_iter().map(IssueTypeDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/issue-types/{id}",
    tag = "issue-types",
    params(("id" = String, Path, description = "Issue type ID")),
    responses(
        (status = 200, description = "Issue type", body = IssueTypeDto),
        (status = 404, description = "Issue type not found")
    )
)]
pub async fn get_issue_type(
    State(state): State<IssueTypesApiState>,
    _auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<IssueTypeDto>, ApiError> {
    let row = issue_type::get_issue_type(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_type_not_found(&id))?;
    Ok(Json(IssueTypeDto::from(row)))
}

#[utoipa::path(
    post,
    path = "/api/issue-types",
    tag = "issue-types",
    request_body = CreateIssueTypeRequest,
    responses(
        (status = 201, description = "Issue type created", body = IssueTypeDto),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_issue_type(
    State(state): State<IssueTypesApiState>,
    _admin: RequireRole<AdminOnly>,
    ValidatedJson(body): ValidatedJson<CreateIssueTypeRequest>,
) -> Result<(StatusCode, Json<IssueTypeDto>), ApiError> {
    let row = issue_type::create_issue_type(
        state.database.pool(),
        NewIssueType {
            name: body.name.trim(),
            icon: body.icon.as_deref(),
            color: body.color.as_deref(),
            description: body.description.as_deref(),
        },
    )
    .await
    .map_err(ApiError::from_data)?;

    Ok((StatusCode::CREATED, Json(IssueTypeDto::from(row))))
}

#[utoipa::path(
    put,
    path = "/api/issue-types/{id}",
    tag = "issue-types",
    params(("id" = String, Path, description = "Issue type ID")),
    request_body = UpdateIssueTypeRequest,
    responses(
        (status = 200, description = "Issue type updated", body = IssueTypeDto),
        (status = 400, description = "No fields to update"),
        (status = 404, description = "Issue type not found"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn update_issue_type(
    State(state): State<IssueTypesApiState>,
    _admin: RequireRole<AdminOnly>,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateIssueTypeRequest>,
) -> Result<Json<IssueTypeDto>, ApiError> {
    check_nullable_color(&body.color)?;

    let update = body.into_update();
    if update.is_empty() {
        return Err(ApiError::no_fields());
    }

    let row = issue_type::update_issue_type(state.database.pool(), &id, update)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_type_not_found(&id))?;
    Ok(Json(IssueTypeDto::from(row)))
}

#[utoipa::path(
    delete,
    path = "/api/issue-types/{id}",
    tag = "issue-types",
    params(("id" = String, Path, description = "Issue type ID")),
    responses(
        (status = 204, description = "Issue type deleted"),
        (status = 404, description = "Issue type not found")
    )
)]
pub async fn delete_issue_type(
    State(state): State<IssueTypesApiState>,
    _admin: RequireRole<AdminOnly>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    let deleted = issue_type::delete_issue_type(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(issue_type_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}
