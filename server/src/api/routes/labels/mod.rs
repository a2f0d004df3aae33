//! Label endpoints (global reference data)

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::{AdminOrQa, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::types::{ApiError, check_nullable_color};
use crate::data::PostgresService;
use crate::data::postgres::repositories::label;

use types::{CreateLabelRequest, LabelDto, UpdateLabelRequest};

#[derive(Clone)]
pub struct LabelsApiState {
    pub database: Arc<PostgresService>,
}

/// Build Labels API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = LabelsApiState { database };

    Router::new()
        .route("/", get(list_labels).post(create_label))
        .route("/{id}", get(get_label).put(update_label).delete(delete_label))
        .with_state(state)
}

fn label_not_found(id: &str) -> ApiError {
    ApiError::not_found("LABEL_NOT_FOUND", format!("Label not found: {}", id))
}

/// All labels ordered by name
#[utoipa::path(
    get,
    path = "/api/labels",
    tag = "labels",
    responses((status = 200, description = "Labels", body = Vec<LabelDto>))
)]
pub async fn list_labels(
    State(state): State<LabelsApiState>,
    _auth: Auth,
) -> Result<Json<Vec<LabelDto>>, ApiError> {
    let rows = label::list_labels(state.database.pool())
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows.into_iter().map(LabelDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/labels/{id}",
    tag = "labels",
    params(("id" = String, Path, description = "Label ID")),
    responses(
        (status = 200, description = "Label", body = LabelDto),
        (status = 404, description = "Label not found")
    )
)]
pub async fn get_label(
    State(state): State<LabelsApiState>,
    _auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<LabelDto>, ApiError> {
    let row = label::get_label(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| label_not_found(&id))?;
    Ok(Json(LabelDto::from(row)))
}

#[utoipa::path(
    post,
    path = "/api/labels",
    tag = "labels",
    request_body = CreateLabelRequest,
    responses(
        (status = 201, description = "Label created", body = LabelDto),
        (status = 403, description = "Admin or QA role required"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_label(
    State(state): State<LabelsApiState>,
    _auth: RequireRole<AdminOrQa>,
    ValidatedJson(body): ValidatedJson<CreateLabelRequest>,
) -> Result<(StatusCode, Json<LabelDto>), ApiError> {
    let row = label::create_label(
        state.database.pool(),
        body.name.trim(),
        body.color.as_deref(),
        body.description.as_deref(),
    )
    .await
    .map_err(ApiError::from_data)?;

    Ok((StatusCode::CREATED, Json(LabelDto::from(row))))
}

#[utoipa::path(
    put,
    path = "/api/labels/{id}",
    tag = "labels",
    params(("id" = String, Path, description = "Label ID")),
    request_body = UpdateLabelRequest,
    responses(
        (status = 200, description = "Label updated", body = LabelDto),
        (status = 400, description = "No fields to update"),
        (status = 404, description = "Label not found"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn update_label(
    State(state): State<LabelsApiState>,
    _auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateLabelRequest>,
) -> Result<Json<LabelDto>, ApiError> {
    check_nullable_color(&body.color)?;

    let update = body.into_update();
    if update.is_empty() {
        return Err(ApiError::no_fields());
    }

    let row = label::update_label(state.database.pool(), &id, update)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| label_not_found(&id))?;
    Ok(Json(LabelDto::from(row)))
}

/// Delete a label; issues keep the name in their label list
#[utoipa::path(
    delete,
    path = "/api/labels/{id}",
    tag = "labels",
    params(("id" = String, Path, description = "Label ID")),
    responses(
        (status = 204, description = "Label deleted"),
        (status = 404, description = "Label not found")
    )
)]
pub async fn delete_label(
    State(state): State<LabelsApiState>,
    _auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    let deleted = label::delete_label(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(label_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}
