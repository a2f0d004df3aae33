//! OpenAPI document and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{
    activities, auth, comments, epics, health, issue_types, issues, labels, projects, sprints,
    users,
};
use crate::api::types::{MessageResponse, PaginationMeta};
use crate::data::types::{
    EpicStatus, IssueKind, IssueStatus, Priority, ProjectStatus, Role, Severity, SprintStatus,
    UserStatus,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QATrack API",
        version = env!("CARGO_PKG_VERSION"),
        description = "QA bug tracking backend"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Login, registration and session"),
        (name = "users", description = "User management"),
        (name = "projects", description = "Projects and their members"),
        (name = "issues", description = "Issues and watchers"),
        (name = "comments", description = "Issue comments"),
        (name = "activities", description = "Project activity log"),
        (name = "sprints", description = "Sprint planning"),
        (name = "epics", description = "Epics with derived progress"),
        (name = "labels", description = "Label reference data"),
        (name = "issue-types", description = "Issue type reference data")
    ),
    paths(
        // Health
        health::health,
        // Auth
        auth::login,
        auth::register,
        auth::current_user,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Projects
        projects::list_projects,
        projects::create_project,
        projects::get_project,
        projects::update_project,
        projects::delete_project,
        projects::list_members,
        projects::add_member,
        projects::remove_member,
        // Issues
        issues::list_issues,
        issues::get_issue,
        issues::create_issue,
        issues::update_issue,
        issues::delete_issue,
        issues::watchers::list_watchers,
        issues::watchers::watch_issue,
        issues::watchers::unwatch_issue,
        issues::watchers::remove_watcher,
        // Comments
        comments::list_comments,
        comments::create_comment,
        comments::update_comment,
        comments::delete_comment,
        // Activities
        activities::list_activities,
        activities::create_activity,
        // Sprints
        sprints::list_sprints,
        sprints::get_sprint,
        sprints::create_sprint,
        sprints::update_sprint,
        sprints::delete_sprint,
        // Epics
        epics::list_epics,
        epics::get_epic,
        epics::create_epic,
        epics::update_epic,
        epics::delete_epic,
        // Labels
        labels::list_labels,
        labels::get_label,
        labels::create_label,
        labels::update_label,
        labels::delete_label,
        // Issue types
        issue_types::list_issue_types,
        issue_types::get_issue_type,
        issue_types::create_issue_type,
        issue_types::update_issue_type,
        issue_types::delete_issue_type,
    ),
    components(schemas(
        // Common
        PaginationMeta,
        MessageResponse,
        health::HealthResponse,
        // Enums
        Role,
        UserStatus,
        ProjectStatus,
        IssueKind,
        Severity,
        IssueStatus,
        Priority,
        SprintStatus,
        EpicStatus,
        // Auth
        auth::LoginRequest,
        auth::LoginResponse,
        auth::RegisterRequest,
        auth::RegisterResponse,
        // Users
        users::types::UserDto,
        users::types::CreateUserRequest,
        users::types::UpdateUserRequest,
        // Projects
        projects::types::ProjectDto,
        projects::types::MemberDto,
        projects::types::CreateProjectRequest,
        projects::types::UpdateProjectRequest,
        projects::types::AddMemberRequest,
        // Issues
        issues::types::IssueDto,
        issues::types::IssueDetailDto,
        issues::types::WatcherDto,
        issues::types::CreateIssueRequest,
        issues::types::UpdateIssueRequest,
        // Comments
        comments::types::CommentDto,
        comments::types::CreateCommentRequest,
        comments::types::UpdateCommentRequest,
        // Activities
        activities::types::ActivityDto,
        activities::types::CreateActivityRequest,
        // Planning
        sprints::types::SprintDto,
        sprints::types::CreateSprintRequest,
        sprints::types::UpdateSprintRequest,
        epics::types::EpicDto,
        epics::types::CreateEpicRequest,
        epics::types::UpdateEpicRequest,
        // Reference data
        labels::types::LabelDto,
        labels::types::CreateLabelRequest,
        labels::types::UpdateLabelRequest,
        issue_types::types::IssueTypeDto,
        issue_types::types::CreateIssueTypeRequest,
        issue_types::types::UpdateIssueTypeRequest,
    ))
)]
pub struct ApiDoc;

/// Serve the OpenAPI JSON document
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>QATrack API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;
