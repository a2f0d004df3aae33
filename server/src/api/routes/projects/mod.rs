//! Project API endpoints
//!
//! Admin sees every project; other roles see the projects they are members of.

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::auth::{AdminOnly, AdminOrQa, Auth, RequireRole};
use crate::api::extractors::{IdPath, UserSubPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::data::PostgresService;
use crate::data::files::UploadService;
use crate::data::postgres::repositories::project::{self, NewProject, ProjectFilter};
use crate::data::postgres::repositories::{member, user};
use crate::data::sparse::SparseUpdate;

use types::{
    AddMemberRequest, CreateProjectRequest, DEFAULT_MEMBER_ROLE, ListProjectsQuery, MemberDto,
    ProjectDto, UpdateProjectRequest,
};

/// Shared state for Projects API endpoints
#[derive(Clone)]
pub struct ProjectsApiState {
    pub database: Arc<PostgresService>,
    pub uploads: Arc<UploadService>,
}

/// Build Projects API routes
pub fn routes(database: Arc<PostgresService>, uploads: Arc<UploadService>) -> Router<()> {
    let state = ProjectsApiState { database, uploads };

    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/{id}/members", get(list_members).post(add_member))
        .route("/{id}/members/{user_id}", delete(remove_member))
        .with_state(state)
}

fn project_not_found(id: &str) -> ApiError {
    ApiError::not_found("PROJECT_NOT_FOUND", format!("Project not found: {}", id))
}

async fn load_project(state: &ProjectsApiState, id: &str) -> Result<ProjectDto, ApiError> {
    let pool = state.database.pool();
    let row = project::get_project(pool, id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| project_not_found(id))?;
    let members = member::list_members(pool, id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(ProjectDto::new(row, members))
}

/// List projects visible to the caller
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "projects",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("search" = Option<String>, Query, description = "Match project name")
    ),
    responses(
        (status = 200, description = "Projects with members and pagination metadata")
    )
)]
pub async fn list_projects(
    State(state): State<ProjectsApiState>,
    auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ListProjectsQuery>,
) -> Result<Json<PaginatedResponse<ProjectDto>>, ApiError> {
    let pool = state.database.pool();
    let filter = ProjectFilter {
        member_id: auth.user.member_scope(),
        status: query.status,
        search: query.search.as_deref(),
    };

    let (rows, total) = project::list_projects(pool, &filter, query.page, query.limit)
        .await
        .map_err(ApiError::from_data)?;

    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let members = member::list_members_for_projects(pool, &ids)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(PaginatedResponse::new(
        ProjectDto::with_grouped_members(rows, members),
        query.page,
        query.limit,
        total,
    )))
}

/// Create a project; the creator becomes its owner
#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectDto),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Admin or QA role required")
    )
)]
pub async fn create_project(
    State(state): State<ProjectsApiState>,
    auth: RequireRole<AdminOrQa>,
    ValidatedJson(body): ValidatedJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectDto>), ApiError> {
    let row = project::create_project(
        state.database.pool(),
        NewProject {
            name: body.name.trim(),
            description: body.description.as_deref(),
            status: body.status,
            start_date: body.start_date,
            end_date: body.end_date,
        },
        &auth.user.id,
    )
    .await
    .map_err(ApiError::from_data)?;

    let project = load_project(&state, &row.id).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Get a single project by ID
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectDto),
        (status = 403, description = "Not a member of this project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project(
    State(state): State<ProjectsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<ProjectDto>, ApiError> {
    auth.require_project(&id).await?;
    Ok(Json(load_project(&state, &id).await?))
}

/// Update a project
#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectDto),
        (status = 400, description = "No fields to update"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn update_project(
    State(state): State<ProjectsApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateProjectRequest>,
) -> Result<Json<ProjectDto>, ApiError> {
    auth.require_project(&id).await?;

    let update = SparseUpdate::new("projects")
        .set("name", body.name)
        .set_nullable("description", body.description)
        .set("status", body.status.map(|s| s.as_str()))
        .set_nullable("start_date", body.start_date)
        .set_nullable("end_date", body.end_date);
    if update.is_empty() {
        return Err(ApiError::no_fields());
    }

    let pool = state.database.pool();
    let row = project::update_project(pool, &id, update)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| project_not_found(&id))?;
    let members = member::list_members(pool, &id)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(ProjectDto::new(row, members)))
}

/// Delete a project with its issues, sprints, epics and activity
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn delete_project(
    State(state): State<ProjectsApiState>,
    admin: RequireRole<AdminOnly>,
    IdPath { id }: IdPath,
) -> Result<StatusCode, ApiError> {
    let pool = state.database.pool();

    let attachments = project::list_project_screenshots(pool, &id)
        .await
        .map_err(ApiError::from_data)?;

    let deleted = project::delete_project(pool, &id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(project_not_found(&id));
    }

    state.uploads.remove_paths(&attachments).await;

    tracing::info!(project_id = %id, admin_id = %admin.user.id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List project members
#[utoipa::path(
    get,
    path = "/api/projects/{id}/members",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project members", body = Vec<MemberDto>),
        (status = 403, description = "Not a member of this project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn list_members(
    State(state): State<ProjectsApiState>,
    auth: Auth,
    IdPath { id }: IdPath,
) -> Result<Json<Vec<MemberDto>>, ApiError> {
    auth.require_project(&id).await?;

    let members = member::list_members(state.database.pool(), &id)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(members.into_iter().map(MemberDto::from).collect()))
}

/// Add a member, or change the label of an existing one
#[utoipa::path(
    post,
    path = "/api/projects/{id}/members",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = MemberDto),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Project or user not found")
    )
)]
pub async fn add_member(
    State(state): State<ProjectsApiState>,
    auth: RequireRole<AdminOrQa>,
    IdPath { id }: IdPath,
    ValidatedJson(body): ValidatedJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberDto>), ApiError> {
    auth.require_project(&id).await?;

    let pool = state.database.pool();
    if user::get_user(pool, &body.user_id)
        .await
        .map_err(ApiError::from_data)?
        .is_none()
    {
        return Err(ApiError::not_found(
            "USER_NOT_FOUND",
            format!("User not found: {}", body.user_id),
        ));
    }

    let role = body.role.as_deref().unwrap_or(DEFAULT_MEMBER_ROLE);
    let added = member::add_member(pool, &id, &body.user_id, role, &auth.user.id)
        .await
        .map_err(ApiError::from_data)?;

    Ok((StatusCode::CREATED, Json(MemberDto::from(added))))
}

/// Remove a member from a project
#[utoipa::path(
    delete,
    path = "/api/projects/{id}/members/{user_id}",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Insufficient role or not a member"),
        (status = 404, description = "Project not found or user is not a member")
    )
)]
pub async fn remove_member(
    State(state): State<ProjectsApiState>,
    auth: RequireRole<AdminOrQa>,
    path: UserSubPath,
) -> Result<StatusCode, ApiError> {
    auth.require_project(&path.id).await?;

    let removed = member::remove_member(state.database.pool(), &path.id, &path.user_id, &auth.user.id)
        .await
        .map_err(ApiError::from_data)?;
    if !removed {
        return Err(ApiError::not_found(
            "MEMBER_NOT_FOUND",
            "User is not a member of this project",
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
