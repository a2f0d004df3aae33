//! Issue API endpoints
//!
//! Create and update accept JSON or multipart (`data` + `attachments`).
//! Stored attachments are appended to the issue's screenshots.

pub mod payload;
pub mod types;
pub mod watchers;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::{AdminOrQa, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedQuery};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::core::constants::ISSUE_BODY_LIMIT;
use crate::data::PostgresService;
use crate::data::files::UploadService;
use crate::data::postgres::repositories::issue::{self, IssueFilter};
use crate::data::postgres::repositories::watcher;

use payload::IssuePayload;
use types::{
    CreateIssueRequest, IssueDetailDto, IssueDto, ListIssuesQuery, UpdateIssueRequest, WatcherDto,
};

/// Shared state for Issues API endpoints
#[derive(Clone)]
pub struct IssuesApiState {
    pub database: Arc<PostgresService>,
    pub uploads: Arc<UploadService>,
}

/// Build Issues API routes
pub fn routes(database: Arc<PostgresService>, uploads: Arc<UploadService>) -> Router<()> {
    let state = IssuesApiState { database, uploads };

    Router::new()
        .route("/", get(list_issues).post(create_issue))
        .route("/{id}", get(get_issue).put(update_issue).delete(delete_issue))
        .route(
            "/{id}/watchers",
            get(watchers::list_watchers)
                .post(watchers::watch_issue)
                .delete(watchers::unwatch_issue),
        )
        .route(
            "/{id}/watchers/{user_id}",
            axum::routing::delete(watchers::remove_watcher),
        )
        .layer(DefaultBodyLimit::max(ISSUE_BODY_LIMIT))
        .with_state(state)
}

pub(crate) fn issue_not_found(id: &str) -> ApiError {
    ApiError::not_found("ISSUE_NOT_FOUND", format!("Issue not found: {}", id))
}

/// Verify the caller may see the issue's project; 404 when the issue is absent
pub(crate) async fn require_issue_access(
    state: &IssuesApiState,
    auth: &Auth,
    issue_id: &str,
) -> Result<String, ApiError> {
    let project_id = issue::get_issue_project_id(state.database.pool(), issue_id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_not_found(issue_id))?;
    auth.require_project(&project_id).await?;
    Ok(project_id)
}

/// List issues visible to the caller
#[utoipa::path(
    get,
    path = "/api/issues",
    tag = "issues",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("projectId" = Option<String>, Query, description = "Filter by project"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("severity" = Option<String>, Query, description = "Filter by severity"),
        ("priority" = Option<String>, Query, description = "Filter by priority"),
        ("type" = Option<String>, Query, description = "Filter by issue type"),
        ("assignedTo" = Option<String>, Query, description = "Filter by assignee"),
        ("reportedBy" = Option<String>, Query, description = "Filter by reporter"),
        ("sprintId" = Option<String>, Query, description = "Filter by sprint"),
        ("epicId" = Option<String>, Query, description = "Filter by epic"),
        ("label" = Option<String>, Query, description = "Filter by label"),
        ("search" = Option<String>, Query, description = "Match title, bug id or description")
    ),
    responses(
        (status = 200, description = "Issues with pagination metadata")
    )
)]
pub async fn list_issues(
    State(state): State<IssuesApiState>,
    auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ListIssuesQuery>,
) -> Result<Json<PaginatedResponse<IssueDto>>, ApiError> {
    let filter = IssueFilter {
        member_id: auth.user.member_scope(),
        project_id: query.project_id.as_deref(),
        status: query.status,
        severity: query.severity,
        priority: query.priority,
        issue_type: query.issue_type,
        assigned_to: query.assigned_to.as_deref(),
        reported_by: query.reported_by.as_deref(),
        sprint_id: query.sprint_id.as_deref(),
        epic_id: query.epic_id.as_deref(),
        label: query.label.as_deref(),
        search: query.search.as_deref(),
    };

    let (rows, total) = issue::list_issues(state.database.pool(), &filter, query.page, query.limit)
        .await
        .map_err(ApiError::from_data)?;

    let data = rows.into_iter().map(IssueDto::from).collect();
    Ok(Json(PaginatedResponse::new(
        data,
        query.page,
        query.limit,
        total,
    )))
}

/// Get a single issue with its watchers
#[utoipa::path(
    get,
    path = "/api/issues/{id}",
    tag = "issues",
    params(("id" = String, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Issue details", body = IssueDetailDto),
        (status = 403, description = "Not a member of the issue's project"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn get_issue(
    State(state): State<IssuesApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<IssueDetailDto>, ApiError> {
    let pool = state.database.pool();
    let row = issue::get_issue(pool, &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_not_found(&id))?;
    auth.require_project(&row.project_id).await?;

    let watchers = watcher::list_watchers(pool, &id)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(IssueDetailDto {
        issue: IssueDto::from(row),
        watchers: watchers.into_iter().map(WatcherDto::from).collect(),
    }))
}

/// Create an issue; its bug id is allocated per project
#[utoipa::path(
    post,
    path = "/api/issues",
    tag = "issues",
    request_body = CreateIssueRequest,
    responses(
        (status = 201, description = "Issue created", body = IssueDto),
        (status = 400, description = "Invalid request or attachments"),
        (status = 403, description = "Not a member of the project"),
        (status = 409, description = "Bug id allocation kept colliding")
    )
)]
pub async fn create_issue(
    State(state): State<IssuesApiState>,
    auth: Auth,
    payload: IssuePayload<CreateIssueRequest>,
) -> Result<(StatusCode, Json<IssueDto>), ApiError> {
    let IssuePayload { body, attachments } = payload;
    auth.require_project(&body.project_id).await?;

    let stored = state
        .uploads
        .save_all(&attachments)
        .await
        .map_err(ApiError::from_upload)?;

    let new_issue = body.into_new_issue(&auth.user.id, stored.clone());
    let row = match issue::create_issue(state.database.pool(), &new_issue, &auth.user.id).await {
        Ok(row) => row,
        Err(e) => {
            state.uploads.remove_paths(&stored).await;
            return Err(ApiError::from_data(e));
        }
    };

    tracing::info!(issue_id = %row.id, bug_id = %row.bug_id, "Issue created");
    Ok((StatusCode::CREATED, Json(IssueDto::from(row))))
}

/// Update an issue
#[utoipa::path(
    put,
    path = "/api/issues/{id}",
    tag = "issues",
    params(("id" = String, Path, description = "Issue ID")),
    request_body = UpdateIssueRequest,
    responses(
        (status = 200, description = "Issue updated", body = IssueDto),
        (status = 400, description = "No fields to update"),
        (status = 403, description = "Not a member of the issue's project"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn update_issue(
    State(state): State<IssuesApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
    payload: IssuePayload<UpdateIssueRequest>,
) -> Result<Json<IssueDto>, ApiError> {
    let IssuePayload {
        mut body,
        attachments,
    } = payload;
    let pool = state.database.pool();

    let current = issue::get_issue(pool, &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_not_found(&id))?;
    auth.require_project(&current.project_id).await?;

    let stored = state
        .uploads
        .save_all(&attachments)
        .await
        .map_err(ApiError::from_upload)?;

    let requested = body.screenshots.take();
    let screenshots = if requested.is_some() || !stored.is_empty() {
        let mut list = requested.unwrap_or_else(|| current.screenshots.clone());
        list.extend(stored.iter().cloned());
        Some(list)
    } else {
        None
    };
    let dropped: Vec<String> = match &screenshots {
        Some(list) => current
            .screenshots
            .iter()
            .filter(|p| !list.contains(p))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let update = body.into_update(screenshots);
    if update.is_empty() {
        return Err(ApiError::no_fields());
    }

    let row = match issue::update_issue(pool, &id, update, &auth.user.id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            state.uploads.remove_paths(&stored).await;
            return Err(issue_not_found(&id));
        }
        Err(e) => {
            state.uploads.remove_paths(&stored).await;
            return Err(ApiError::from_data(e));
        }
    };

    state.uploads.remove_paths(&dropped).await;
    Ok(Json(IssueDto::from(row)))
}

/// Delete an issue with its comments and watchers
#[utoipa::path(
    delete,
    path = "/api/issues/{id}",
    tag = "issues",
    params(("id" = String, Path, description = "Issue ID")),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn delete_issue(
    State(state): State<IssuesApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    let pool = state.database.pool();
    let project_id = issue::get_issue_project_id(pool, &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_not_found(&id))?;
    auth.require_project(&project_id).await?;

    let deleted = issue::delete_issue(pool, &id, &auth.user.id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| issue_not_found(&id))?;

    state.uploads.remove_paths(&deleted.screenshots).await;
    Ok(StatusCode::NO_CONTENT)
}
