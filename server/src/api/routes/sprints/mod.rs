//! Sprint API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::{AdminOrQa, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::ApiError;
use crate::data::PostgresService;
use crate::data::postgres::repositories::sprint::{self, NewSprint};
use crate::data::types::SprintRow;

use super::project_scope;
use types::{
    CreateSprintRequest, ProjectScopeQuery, SprintDto, UpdateSprintRequest,
    check_updated_date_range,
};

#[derive(Clone)]
pub struct SprintsApiState {
    pub database: Arc<PostgresService>,
}

/// Build Sprints API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = SprintsApiState { database };

    Router::new()
        .route("/", get(list_sprints).post(create_sprint))
        .route(
            "/{id}",
            get(get_sprint).put(update_sprint).delete(delete_sprint),
        )
        .with_state(state)
}

fn sprint_not_found(id: &str) -> ApiError {
    ApiError::not_found("SPRINT_NOT_FOUND", format!("Sprint not found: {}", id))
}

async fn load_sprint(state: &SprintsApiState, id: &str) -> Result<SprintRow, ApiError> {
    sprint::get_sprint(state.database.pool(), id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| sprint_not_found(id))
}

async fn sprint_project(state: &SprintsApiState, id: &str) -> Result<String, ApiError> {
    Ok(load_sprint(state, id).await?.project_id)
}

/// List sprints, most recent start first
#[utoipa::path(
    get,
    path = "/api/sprints",
    tag = "sprints",
    params(("projectId" = Option<String>, Query, description = "Project to list; required for non-Admin users")),
    responses(
        (status = 200, description = "Sprints", body = Vec<SprintDto>),
        (status = 400, description = "projectId missing"),
        (status = 403, description = "Not a member of this project")
    )
)]
pub async fn list_sprints(
    State(state): State<SprintsApiState>,
    auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ProjectScopeQuery>,
) -> Result<Json<Vec<SprintDto>>, ApiError> {
    let project_id = project_scope(&auth, query.project_id.as_deref()).await?;

    let rows = sprint::list_sprints(state.database.pool(), project_id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows.into_iter().map(SprintDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/sprints/{id}",
    tag = "sprints",
    params(("id" = String, Path, description = "Sprint ID")),
    responses(
        (status = 200, description = "Sprint", body = SprintDto),
        (status = 403, description = "Not a member of the sprint's project"),
        (status = 404, description = "Sprint not found")
    )
)]
pub async fn get_sprint(
    State(state): State<SprintsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<SprintDto>, ApiError> {
    let row = sprint::get_sprint(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| sprint_not_found(&id))?;
    auth.require_project(&row.project_id).await?;

    Ok(Json(SprintDto::from(row)))
}

#[utoipa::path(
    post,
    path = "/api/sprints",
    tag = "sprints",
    request_body = CreateSprintRequest,
    responses(
        (status = 201, description = "Sprint created", body = SprintDto),
        (status = 400, description = "Invalid request or unknown project"),
        (status = 403, description = "Insufficient role or not a member")
    )
)]
pub async fn create_sprint(
    State(state): State<SprintsApiState>,
    auth: RequireRole<AdminOrQa>,
    ValidatedJson(body): ValidatedJson<CreateSprintRequest>,
) -> Result<(StatusCode, Json<SprintDto>), ApiError> {
    auth.require_project(&body.project_id).await?;

    let row = sprint::create_sprint(
        state.database.pool(),
        NewSprint {
            project_id: &body.project_id,
            name: body.name.trim(),
            goal: body.goal.as_deref(),
            start_date: body.start_date,
            end_date: body.end_date,
            status: body.status,
        },
    )
    .await
    .map_err(ApiError::from_data)?;

    tracing::info!(sprint_id = %row.id, project_id = %row.project_id, "Sprint created");
    Ok((StatusCode::CREATED, Json(SprintDto::from(row))))
}

#[utoipa::path(
    put,
    path = "/api/sprints/{id}",
    tag = "sprints",
    params(("id" = String, Path, description = "Sprint ID")),
    request_body = UpdateSprintRequest,
    responses(
        (status = 200, description = "Sprint updated", body = SprintDto),
        (status = 400, description = "No fields to update"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Sprint not found")
    )
)]
pub async fn update_sprint(
    State(state): State<SprintsApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateSprintRequest>,
) -> Result<Json<SprintDto>, ApiError> {
    let current = load_sprint(&state, &id).await?;
    auth.require_project(&current.project_id).await?;

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

    let row = sprint::update_sprint(state.database.pool(), &id, update)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| sprint_not_found(&id))?;
    Ok(Json(SprintDto::from(row)))
}

/// Delete a sprint; its issues stay with the sprint cleared
#[utoipa::path(
    delete,
    path = "/api/sprints/{id}",
    tag = "sprints",
    params(("id" = String, Path, description = "Sprint ID")),
    responses(
        (status = 204, description = "Sprint deleted"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Sprint not found")
    )
)]
pub async fn delete_sprint(
    State(state): State<SprintsApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    let project_id = sprint_project(&state, &id).await?;
    auth.require_project(&project_id).await?;

    let deleted = sprint::delete_sprint(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(sprint_not_found(&id));
    }

    Ok(StatusCode::NO_CONTENT)
}
