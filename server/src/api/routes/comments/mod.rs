//! Comment API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::auth::Auth;
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::routes::issues::issue_not_found;
use crate::api::types::ApiError;
use crate::data::PostgresService;
use crate::data::postgres::repositories::{comment, issue};
use crate::data::types::CommentRow;

use types::{CommentDto, CreateCommentRequest, UpdateCommentRequest, can_modify_comment};

/// Shared state for Comments API endpoints
#[derive(Clone)]
pub struct CommentsApiState {
    pub database: Arc<PostgresService>,
}

/// Build Comments API routes
pub fn routes(database: Arc<PostgresService>) -> Router<()> {
    let state = CommentsApiState { database };

    Router::new()
        .route("/", post(create_comment))
        .route("/issue/{id}", get(list_comments))
        .route("/{id}", put(update_comment).delete(delete_comment))
        .with_state(state)
}

async fn require_issue_project(
    state: &CommentsApiState,
    auth: &Auth,
    issue_id: &str,
) -> Result<(), ApiError> {
    let project_id = issue::get_issue_project_id(state.database.pool(), issue_id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_not_found(issue_id))?;
    auth.require_project(&project_id).await
}

/// Load a comment the caller is allowed to change
async fn modifiable_comment(
    state: &CommentsApiState,
    auth: &Auth,
    id: &str,
) -> Result<CommentRow, ApiError> {
    let row = comment::get_comment(state.database.pool(), id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| comment_not_found(id))?;

    if !can_modify_comment(row.user_id.as_deref(), &auth.user.id, auth.is_admin()) {
        return Err(ApiError::forbidden(
            "ACCESS_DENIED",
            "Only the author or an Admin can change this comment",
        ));
    }
    Ok(row)
}

fn comment_not_found(id: &str) -> ApiError {
    ApiError::not_found("COMMENT_NOT_FOUND", format!("Comment not found: {}", id))
}

/// Comments on an issue, oldest first
#[utoipa::path(
    get,
    path = "/api/comments/issue/{id}",
    tag = "comments",
    params(("id" = String, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Comments", body = Vec<CommentDto>),
        (status = 403, description = "Not a member of the issue's project"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn list_comments(
    State(state): State<CommentsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<Vec<CommentDto>>, ApiError> {
    require_issue_project(&state, &auth, &id).await?;

    let rows = comment::list_for_issue(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows.into_iter().map(CommentDto::from).collect()))
}

/// Add a comment to an issue
#[utoipa::path(
    post,
    path = "/api/comments",
    tag = "comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentDto),
        (status = 403, description = "Not a member of the issue's project"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn create_comment(
    State(state): State<CommentsApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentDto>), ApiError> {
    require_issue_project(&state, &auth, &body.issue_id).await?;

    let row = comment::create_comment(
        state.database.pool(),
        &body.issue_id,
        &auth.user.id,
        body.content.trim(),
    )
    .await
    .map_err(ApiError::from_data)?;

    Ok((StatusCode::CREATED, Json(CommentDto::from(row))))
}

/// Edit a comment (author or Admin)
#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    tag = "comments",
    params(("id" = String, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentDto),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn update_comment(
    State(state): State<CommentsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateCommentRequest>,
) -> Result<Json<CommentDto>, ApiError> {
    modifiable_comment(&state, &auth, &id).await?;

    let row = comment::update_comment(state.database.pool(), &id, body.content.trim())
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| comment_not_found(&id))?;

    Ok(Json(CommentDto::from(row)))
}

/// Delete a comment (author or Admin)
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    tag = "comments",
    params(("id" = String, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<CommentsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    modifiable_comment(&state, &auth, &id).await?;

    let deleted = comment::delete_comment(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(comment_not_found(&id));
    }

    Ok(StatusCode::NO_CONTENT)
}
