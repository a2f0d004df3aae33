//! Authorization extractors for Axum handlers
//!
//! These extractors read what `require_auth` put into request extensions and
//! apply role checks before the handler runs.
//!
//! # Usage
//!
//! ```no_run
//! # use qatrack_server::api::auth::{AdminOrQa, Auth, RequireRole};
//! # use qatrack_server::api::types::ApiError;
//! pub async fn delete_issue(auth: RequireRole<AdminOrQa>) -> Result<(), ApiError> {
//!     let user_id = &auth.user.id;
//!     Ok(())
//! }
//!
//! pub async fn get_issue(auth: Auth) -> Result<(), ApiError> {
//!     auth.require_project("project-abc").await?;
//!     Ok(())
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::context::{AuthService, AuthUser};
use crate::api::types::ApiError;
use crate::data::types::Role;

// ============================================================================
// Role Markers
// ============================================================================

/// Marker trait listing the roles allowed through `RequireRole`
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [Role];
    /// Human-readable list for the 403 message
    const DESCRIPTION: &'static str;

    fn allows(role: Role) -> bool {
        Self::ROLES.contains(&role)
    }
}

/// Admin only
pub struct AdminOnly;
impl RoleSet for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
    const DESCRIPTION: &'static str = "Admin";
}

/// Admin or QA
pub struct AdminOrQa;
impl RoleSet for AdminOrQa {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Qa];
    const DESCRIPTION: &'static str = "Admin or QA";
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Authenticated caller plus the authorization service.
///
/// Use for routes open to any authenticated user; project-scoped handlers
/// call `require_project` with the owning project.
pub struct Auth {
    pub user: AuthUser,
    service: Arc<AuthService>,
}

impl Auth {
    /// 404 if the project is missing, 403 if the caller may not see it
    pub async fn require_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.service
            .verify_project_access(&self.user, project_id)
            .await
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

fn extract_auth(parts: &Parts) -> Result<Auth, ApiError> {
    let user = parts
        .extensions
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::internal("Auth context not available"))?;

    let service = parts
        .extensions
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| ApiError::internal("Auth context not available"))?;

    Ok(Auth { user, service })
}

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_auth(parts)
    }
}

// ============================================================================
// Role Extractor
// ============================================================================

/// Authenticated caller whose global role is in `R`; 403 otherwise
pub struct RequireRole<R: RoleSet> {
    pub user: AuthUser,
    auth: Auth,
    _roles: PhantomData<R>,
}

impl<R: RoleSet> RequireRole<R> {
    pub async fn require_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.auth.require_project(project_id).await
    }
}

/// 403 unless `role` is in `R`
pub fn check_role<R: RoleSet>(role: Role) -> Result<(), ApiError> {
    if R::allows(role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "INSUFFICIENT_ROLE",
            format!("This action requires the {} role", R::DESCRIPTION),
        ))
    }
}

impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: Send + Sync,
    R: RoleSet,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = extract_auth(parts)?;
        check_role::<R>(auth.user.role)?;

        Ok(Self {
            user: auth.user.clone(),
            auth,
            _roles: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::StatusCode;
    use axum::middleware::{self, Next};
    use axum::routing::delete;
    use tower::ServiceExt;

    use crate::data::PostgresService;

    async fn remove(auth: RequireRole<AdminOrQa>) -> String {
        auth.user.id
    }

    fn app(role: Role) -> Router {
        Router::new()
            .route("/issues", delete(remove))
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
            }))
    }

    fn request() -> Request {
        Request::builder()
            .method("DELETE")
            .uri("/issues")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_allowed_roles_pass() {
        for role in [Role::Admin, Role::Qa] {
            let response = app(role).oneshot(request()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", role);
        }
    }

    #[tokio::test]
    async fn test_other_roles_get_403() {
        let response = app(Role::Developer).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_context_is_500() {
        let response = Router::new()
            .route("/issues", delete(remove))
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_role_sets() {
        assert!(check_role::<AdminOnly>(Role::Admin).is_ok());
        assert!(check_role::<AdminOnly>(Role::Qa).is_err());
        assert!(check_role::<AdminOrQa>(Role::Qa).is_ok());
        assert!(check_role::<AdminOrQa>(Role::Developer).is_err());
    }
}
