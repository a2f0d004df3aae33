//! Error type for the data layer

use thiserror::Error;

/// SQLSTATE for `unique_violation`
const PG_UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `foreign_key_violation`
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// SQLSTATE for `check_violation`
const PG_CHECK_VIOLATION: &str = "23514";

/// Error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// PostgreSQL error not covered by a more specific variant
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unique constraint violated; carries the constraint name
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Foreign key or check constraint violated; carries the constraint name
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Sparse update with no columns to set
    #[error("No fields to update")]
    EmptyUpdate,
}

impl DataError {
    /// Create a migration failed error
    pub fn migration_failed(version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }

    /// True when a unique constraint with the given name was violated
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, Self::Conflict(name) if name == constraint)
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Postgres(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or_default().to_string();
            match db.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => return Self::Conflict(constraint),
                Some(PG_FOREIGN_KEY_VIOLATION) | Some(PG_CHECK_VIOLATION) => {
                    return Self::InvalidReference(constraint);
                }
                _ => {}
            }
        }
        Self::Postgres(e)
    }
}
