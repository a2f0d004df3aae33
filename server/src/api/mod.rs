//! API server and routes

pub mod auth;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
mod server;
pub mod types;

pub use auth::AuthManager;
pub use server::ApiServer;
