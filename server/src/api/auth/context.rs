//! Authenticated user context and project authorization
//!
//! `AuthUser` is what `require_auth` puts into request extensions.
//! `AuthService` answers project-scoped access questions against the database.

use crate::api::types::ApiError;
use crate::data::postgres::PgPool;
use crate::data::postgres::repositories::{member, project};
use crate::data::types::Role;

use super::jwt::Claims;

/// The caller, as carried by a valid token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl AuthUser {
    /// Build from claims; a token with an unknown role is not accepted
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let role = claims.role.parse().ok()?;
        Some(Self {
            id: claims.id,
            email: claims.email,
            role,
            name: claims.name,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Membership filter for listings: `None` for Admin (sees everything)
    pub fn member_scope(&self) -> Option<&str> {
        if self.is_admin() {
            None
        } else {
            Some(&self.id)
        }
    }
}

/// Admin sees every project; everyone else only projects they belong to
pub fn can_view_project(role: Role, is_member: bool) -> bool {
    role.is_admin() || is_member
}

/// Authorization checks that need the database
#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify the user may access a project
    ///
    /// 404 when the project does not exist, 403 for a non-member non-Admin.
    pub async fn verify_project_access(
        &self,
        user: &AuthUser,
        project_id: &str,
    ) -> Result<(), ApiError> {
        let is_member = if user.is_admin() {
            false
        } else {
            member::is_member(&self.pool, project_id, &user.id)
                .await
                .map_err(ApiError::from_data)?
        };

        if is_member {
            return Ok(());
        }

        let exists = project::project_exists(&self.pool, project_id)
            .await
            .map_err(ApiError::from_data)?;
        if !exists {
            return Err(ApiError::not_found(
                "PROJECT_NOT_FOUND",
                format!("Project not found: {}", project_id),
            ));
        }

        if can_view_project(user.role, is_member) {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "ACCESS_DENIED",
                "You are not a member of this project",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims::new("user-9", "u9@example.com", role, "Uma")
    }

    #[test]
    fn test_can_view_project() {
        assert!(can_view_project(Role::Admin, false));
        assert!(can_view_project(Role::Qa, true));
        assert!(can_view_project(Role::Developer, true));
        assert!(!can_view_project(Role::Qa, false));
        assert!(!can_view_project(Role::Developer, false));
    }

    #[test]
    fn test_from_claims_parses_role() {
        let user = AuthUser::from_claims(claims("QA")).unwrap();
        assert_eq!(user.role, Role::Qa);
        assert_eq!(user.member_scope(), Some("user-9"));

        let admin = AuthUser::from_claims(claims("Admin")).unwrap();
        assert_eq!(admin.member_scope(), None);
    }

    #[test]
    fn test_from_claims_rejects_unknown_role() {
        assert!(AuthUser::from_claims(claims("Superuser")).is_none());
    }
}
