//! Issue watcher endpoints

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::api::auth::{AdminOrQa, Auth, check_role};
use crate::api::extractors::{IdPath, UserSubPath};
use crate::api::types::ApiError;
use crate::data::postgres::repositories::watcher;

use super::types::WatcherDto;
use super::{IssuesApiState, require_issue_access};

async fn current_watchers(
    state: &IssuesApiState,
    issue_id: &str,
) -> Result<Vec<WatcherDto>, ApiError> {
    let rows = watcher::list_watchers(state.database.pool(), issue_id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(rows.into_iter().map(WatcherDto::from).collect())
}

/// List watchers of an issue
#[utoipa::path(
    get,
    path = "/api/issues/{id}/watchers",
    tag = "issues",
    params(("id" = String, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Watchers", body = Vec<WatcherDto>),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn list_watchers(
    State(state): State<IssuesApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<Vec<WatcherDto>>, ApiError> {
    require_issue_access(&state, &auth, &id).await?;
    Ok(Json(current_watchers(&state, &id).await?))
}

/// Watch an issue as the current user
#[utoipa::path(
    post,
    path = "/api/issues/{id}/watchers",
    tag = "issues",
    params(("id" = String, Path, description = "Issue ID")),
    responses(
        (status = 201, description = "Now watching", body = Vec<WatcherDto>),
        (status = 200, description = "Already watching", body = Vec<WatcherDto>),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn watch_issue(
    State(state): State<IssuesApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<(StatusCode, Json<Vec<WatcherDto>>), ApiError> {
    require_issue_access(&state, &auth, &id).await?;

    let added = watcher::add_watcher(state.database.pool(), &id, &auth.user.id)
        .await
        .map_err(ApiError::from_data)?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(current_watchers(&state, &id).await?)))
}

/// Stop watching an issue as the current user
#[utoipa::path(
    delete,
    path = "/api/issues/{id}/watchers",
    tag = "issues",
    params(("id" = String, Path, description = "Issue ID")),
    responses(
        (status = 204, description = "No longer watching"),
        (status = 404, description = "Issue not found or not watching")
    )
)]
pub async fn unwatch_issue(
    State(state): State<IssuesApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    require_issue_access(&state, &auth, &id).await?;
    remove(&state, &id, &auth.user.id).await
}

/// Remove a watcher; Admin and QA may remove anyone, others only themselves
#[utoipa::path(
    delete,
    path = "/api/issues/{id}/watchers/{user_id}",
    tag = "issues",
    params(
        ("id" = String, Path, description = "Issue ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Watcher removed"),
        (status = 403, description = "Cannot remove another user's watch"),
        (status = 404, description = "Issue not found or not watching")
    )
)]
pub async fn remove_watcher(
    State(state): State<IssuesApiState>,
    auth: Auth,
    path: UserSubPath,
) -> Result<StatusCode, ApiError> {
    if path.user_id != auth.user.id {
        check_role::<AdminOrQa>(auth.user.role)?;
    }
    require_issue_access(&state, &auth, &path.id).await?;
    remove(&state, &path.id, &path.user_id).await
}

async fn remove(state: &IssuesApiState, issue_id: &str, user_id: &str) -> Result<StatusCode, ApiError> {
    let removed = watcher::remove_watcher(state.database.pool(), issue_id, user_id)
        .await
        .map_err(ApiError::from_data)?;
    if !removed {
        return Err(ApiError::not_found(
            "WATCHER_NOT_FOUND",
            "User is not watching this issue",
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}
