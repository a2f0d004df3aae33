//! Data storage layer
//!
//! - `postgres` - The shared connection pool, schema, migrations and repositories
//! - `sparse` - Partial `UPDATE` builder used by every editable resource
//! - `files` - Attachment storage served under `/uploads`
//! - `types` - Row types and enumerations shared with the API layer
//! - `error` - Unified error type for the data layer

pub mod error;
pub mod files;
pub mod postgres;
pub mod sparse;
pub mod types;

pub use error::DataError;
pub use postgres::PostgresService;
