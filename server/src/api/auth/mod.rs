//! Authentication module

mod context;
mod extractors;
pub mod jwt;
mod manager;
pub mod middleware;
pub mod password;

pub use context::{AuthService, AuthUser, can_view_project};
pub use extractors::{AdminOnly, AdminOrQa, Auth, RequireRole, RoleSet, check_role};
pub use jwt::Claims;
pub use manager::AuthManager;
pub use middleware::{AuthError, AuthState, require_auth};
