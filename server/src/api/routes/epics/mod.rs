//! Epic API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::{AdminOrQa, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::routes::sprints::types::{ProjectScopeQuery, check_updated_date_range};
use crate::api::types::{ApiError, check_nullable_color};
use crate::data::PostgresService;
use crate::data::postgres::repositories::epic::{self, NewEpic};

use super::project_scope;
use types::{CreateEpicRequest, EpicDto, UpdateEpicRequest};

#[derive(Clone)]
pub struct EpicsApiState {
    pub database: Arc<PostgresService>,
}

/// Build Epics API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = EpicsApiState { database };

    Router::new()
        .route("/", get(list_epics).post(create_epic))
        .route("/{id}", get(get_epic).put(update_epic).delete(delete_epic))
        .with_state(state)
}

fn epic_not_found(id: &str) -> ApiError {
    ApiError::not_found("EPIC_NOT_FOUND", format!("Epic not found: {}", id))
}

async fn load_epic(state: &EpicsApiState, id: &str) -> Result<EpicDto, ApiError> {
    let row = epic::get_epic(state.database.pool(), id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| epic_not_found(id))?;
    Ok(EpicDto::from(row))
}

/// List epics with derived progress
#[utoipa::path(
    get,
    path = "/api/epics",
    tag = "epics",
    params(("projectId" = Option<String>, Query, description = "Project to list; required for non-Admin users")),
    responses(
        (status = 200, description = "Epics", body = Vec<EpicDto>),
        (status = 400, description = "projectId missing"),
        (status = 403, description = "Not a member of this project")
    )
)]
pub async fn list_epics(
    State(state): State<EpicsApiState>,
    auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ProjectScopeQuery>,
) -> Result<Json<Vec<EpicDto>>, ApiError> {
    let project_id = project_scope(&auth, query.project_id.as_deref()).await?;

    let rows = epic::list_epics(state.database.pool(), project_id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows.into_iter().map(EpicDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/epics/{id}",
    tag = "epics",
    params(("id" = String, Path, description = "Epic ID")),
    responses(
        (status = 200, description = "Epic", body = EpicDto),
        (status = 403, description = "Not a member of the epic's project"),
        (status = 404, description = "Epic not found")
    )
)]
pub async fn get_epic(
    State(state): State<EpicsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<EpicDto>, ApiError> {
    let epic = load_epic(&state, &id).await?;
    auth.require_project(&epic.project_id).await?;
    Ok(Json(epic))
}

#[utoipa::path(
    post,
    path = "/api/epics",
    tag = "epics",
    request_body = CreateEpicRequest,
    responses(
        (status = 201, description = "Epic created", body = EpicDto),
        (status = 400, description = "Invalid request or unknown project"),
        (status = 403, description = "Insufficient role or not a member")
    )
)]
pub async fn create_epic(
    State(state): State<EpicsApiState>,
    auth: RequireRole<AdminOrQa>,
    ValidatedJson(body): ValidatedJson<CreateEpicRequest>,
) -> Result<(StatusCode, Json<EpicDto>), ApiError> {
    auth.require_project(&body.project_id).await?;

    let row = epic::create_epic(
        state.database.pool(),
        NewEpic {
            project_id: &body.project_id,
            name: body.name.trim(),
            description: body.description.as_deref(),
            status: body.status,
            color: body.color.as_deref(),
            start_date: body.start_date,
            end_date: body.end_date,
        },
    )
    .await
    .map_err(ApiError::from_data)?;

    tracing::info!(epic_id = %row.id, project_id = %row.project_id, "Epic created");
    Ok((StatusCode::CREATED, Json(EpicDto::from(row))))
}

#[utoipa::path(
    put,
    path = "/api/epics/{id}",
    tag = "epics",
    params(("id" = String, Path, description = "Epic ID")),
    request_body = UpdateEpicRequest,
    responses(
        (status = 200, description = "Epic updated", body = EpicDto),
        (status = 400, description = "No fields to update or invalid color"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Epic not found")
    )
)]
pub async fn update_epic(
    State(state): State<EpicsApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateEpicRequest>,
) -> Result<Json<EpicDto>, ApiError> {
    let current = load_epic(&state, &id).await?;
    auth.require_project(&current.project_id).await?;

    check_nullable_color(&body.color)?;
    check_updated_date_range(
        current.start_date,
        current.end_date,
        body.start_date,
        body.end_date,
    )?;

    let update = body.into_update();
    if update.is_empty() {
        return Err(ApiError::no_fields());
    }

    let row = epic::update_epic(state.database.pool(), &id, update)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| epic_not_found(&id))?;
    Ok(Json(EpicDto::from(row)))
}

/// Delete an epic; its issues stay with the epic cleared
#[utoipa::path(
    delete,
    path = "/api/epics/{id}",
    tag = "epics",
    params(("id" = String, Path, description = "Epic ID")),
    responses(
        (status = 204, description = "Epic deleted"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Epic not found")
    )
)]
pub async fn delete_epic(
    State(state): State<EpicsApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    let current = load_epic(&state, &id).await?;
    auth.require_project(&current.project_id).await?;

    let deleted = epic::delete_epic(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(epic_not_found(&id));
    }

    Ok(StatusCode::NO_CONTENT)
}
