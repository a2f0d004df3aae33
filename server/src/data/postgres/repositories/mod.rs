//! PostgreSQL repositories
//!
//! Free functions over `&PgPool`, one module per resource. Row types live in
//! `crate::data::types`.

pub mod activity;
pub mod comment;
pub mod epic;
pub mod issue;
pub mod issue_type;
pub mod label;
pub mod member;
pub mod project;
pub mod sprint;
pub mod user;
pub mod watcher;
