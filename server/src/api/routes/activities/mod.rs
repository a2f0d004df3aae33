//! Activity log endpoints (append-only)

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::Auth;
use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::ApiError;
use crate::data::PostgresService;
use crate::data::postgres::repositories::activity;

use types::{ActivityDto, CreateActivityRequest, ListActivitiesQuery};

#[derive(Clone)]
pub struct ActivitiesApiState {
    pub database: Arc<PostgresService>,
}

/// Build Activities API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = ActivitiesApiState { database };

    Router::new()
        .route("/", post(create_activity))
        .route("/project/{id}", get(list_activities))
        .with_state(state)
}

/// Recent activity of a project, newest first
#[utoipa::path(
    get,
    path = "/api/activities/project/{id}",
    tag = "activities",
    params(
        ("id" = String, Path, description = "Project ID"),
        ("limit" = Option<u32>, Query, description = "Maximum entries to return")
    ),
    responses(
        (status = 200, description = "Activities", body = Vec<ActivityDto>),
        (status = 403, description = "Not a member of this project")
    )
)]
pub async fn list_activities(
    State(state): State<ActivitiesApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
    ValidatedQuery(query): ValidatedQuery<ListActivitiesQuery>,
) -> Result<Json<Vec<ActivityDto>>, ApiError> {
    auth.require_project(&id).await?;

    let rows = activity::list_for_project(state.database.pool(), &id, query.limit)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows.into_iter().map(ActivityDto::from).collect()))
}

/// Append an activity entry as the caller
#[utoipa::path(
    post,
    path = "/api/activities",
    tag = "activities",
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity recorded", body = ActivityDto),
        (status = 400, description = "Invalid request or unknown project"),
        (status = 403, description = "Not a member of this project")
    )
)]
pub async fn create_activity(
    State(state): State<ActivitiesApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<CreateActivityRequest>,
) -> Result<(StatusCode, Json<ActivityDto>), ApiError> {
    auth.require_project(&body.project_id).await?;

    let mut row = activity::insert_activity(
        state.database.pool(),
        &body.project_id,
        Some(&auth.user.id),
        body.action.trim(),
        body.details.as_deref(),
    )
    .await
    .map_err(ApiError::from_data)?;
    row.user_name = Some(auth.user.name.clone());

    Ok((StatusCode::CREATED, Json(ActivityDto::from(row))))
}
