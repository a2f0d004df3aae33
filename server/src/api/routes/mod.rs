//! API route handlers

pub mod activities;
pub mod auth;
pub mod comments;
pub mod epics;
pub mod health;
pub mod issue_types;
pub mod issues;
pub mod labels;
pub mod projects;
pub mod sprints;
pub mod users;

use crate::api::auth::Auth;
use crate::api::types::ApiError;

/// Resolve the project filter for sprint and epic listings.
///
/// Admin may list across all projects. Everyone else must name a project
/// they belong to.
pub(crate) async fn project_scope<'a>(
    auth: &Auth,
    project_id: Option<&'a str>,
) -> Result<Option<&'a str>, ApiError> {
    match project_id {
        Some(id) => {
            auth.require_project(id).await?;
            Ok(Some(id))
        }
        None if auth.is_admin() => Ok(None),
        None => Err(ApiError::bad_request(
            "PROJECT_ID_REQUIRED",
            "projectId query parameter is required",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::StatusCode;
    use axum::middleware::{self, Next};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;
    use crate::api::auth::{AuthService, AuthUser};
    use crate::data::PostgresService;
    use crate::data::types::Role;

    async fn unscoped(auth: Auth) -> axum::response::Response {
        match project_scope(&auth, None).await {
            Ok(scope) => scope.unwrap_or("all").to_string().into_response(),
            Err(e) => e.into_response(),
        }
    }

    async fn status_for(role: Role) -> StatusCode {
        let app = Router::new()
            .route("/sprints", get(unscoped))
            .layer(middleware::from_fn(move |mut req: Request, next: Next| async move {
                let pool = PostgresService::lazy_for_test().pool().clone();
                req.extensions_mut().insert(AuthUser {
                    id: "user-1".to_string(),
                    email: "u1@example.com".to_string(),
                    role,
                    name: "U1".to_string(),
                });
                req.extensions_mut().insert(Arc::new(AuthService::new(pool)));
                next.run(req).await
            }));

        let req = Request::builder()
            .uri("/sprints")
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_admin_may_list_without_project() {
        assert_eq!(status_for(Role::Admin).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_others_must_name_a_project() {
        assert_eq!(status_for(Role::Qa).await, StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Role::Developer).await, StatusCode::BAD_REQUEST);
    }
}
