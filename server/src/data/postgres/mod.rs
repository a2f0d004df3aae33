//! PostgreSQL database service
//!
//! Owns the single process-wide connection pool:
//! - Connection pooling with min/max bounds
//! - Idle connection cleanup
//! - Connection lifetime cycling
//! - Query timeout protection
//!
//! All schema definitions and migrations are managed here.

mod migrations;
pub mod repositories;
pub mod schema;
#[cfg(test)]
pub mod testing;

pub use sqlx::PgPool;

use std::sync::Arc;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;
use crate::core::constants::{
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS,
};
use crate::data::error::DataError;

/// Interval between pool health checks
const HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

/// PostgreSQL database service
///
/// Created once at server startup and shared by `Arc` with every router.
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    /// Connect, then apply pending migrations
    pub async fn init(config: &PostgresConfig) -> Result<Self, DataError> {
        let max_connections = if config.max_connections > 0 {
            config.max_connections
        } else {
            POSTGRES_DEFAULT_MAX_CONNECTIONS
        };

        let min_connections = if config.min_connections > 0 {
            config.min_connections.min(max_connections)
        } else {
            POSTGRES_DEFAULT_MIN_CONNECTIONS.min(max_connections)
        };

        let acquire_timeout = if config.acquire_timeout_secs > 0 {
            config.acquire_timeout_secs
        } else {
            POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS
        };

        let idle_timeout = if config.idle_timeout_secs > 0 {
            config.idle_timeout_secs
        } else {
            POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS
        };

        let max_lifetime = if config.max_lifetime_secs > 0 {
            config.max_lifetime_secs
        } else {
            POSTGRES_DEFAULT_MAX_LIFETIME_SECS
        };

        // 0 disables the statement timeout
        let statement_timeout = config.statement_timeout_secs;

        let mut options = connect_options(config)?.log_statements(LevelFilter::Trace);

        if statement_timeout > 0 {
            options = options.options([("statement_timeout", format!("{}s", statement_timeout))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .connect_with(options)
            .await
            .map_err(DataError::Postgres)?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            max_connections,
            min_connections,
            acquire_timeout_secs = acquire_timeout,
            idle_timeout_secs = idle_timeout,
            max_lifetime_secs = max_lifetime,
            statement_timeout_secs = statement_timeout,
            "PostgresService initialized"
        );
        Ok(Self { pool })
    }

    /// Pool that never connects; for tests that must not touch a database
    #[cfg(test)]
    pub fn lazy_for_test() -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(50))
            .connect_lazy_with(PgConnectOptions::new().host("127.0.0.1").port(1));
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }

    /// Start a background health check task
    pub fn start_health_check_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let db = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(HEALTH_CHECK_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("PostgreSQL health check task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = sqlx::query("SELECT 1").execute(&db.pool).await {
                            tracing::warn!(error = %e, "PostgreSQL health check failed");
                        }
                    }
                }
            }
        })
    }
}

/// Connection options from a URL, or from the discrete host/port/user fields
fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions, DataError> {
    if let Some(url) = config.url.as_deref() {
        return url
            .parse()
            .map_err(|e| DataError::Config(format!("Invalid PostgreSQL URL: {}", e)));
    }

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.name);
    if let Some(password) = config.password.as_deref() {
        options = options.password(password);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> PostgresConfig {
        PostgresConfig {
            url: url.map(String::from),
            host: "db.internal".to_string(),
            port: 6543,
            user: "tracker".to_string(),
            password: Some("p@ss:word/".to_string()),
            name: "bugs".to_string(),
            max_connections: 0,
            min_connections: 0,
            acquire_timeout_secs: 0,
            idle_timeout_secs: 0,
            max_lifetime_secs: 0,
            statement_timeout_secs: 0,
        }
    }

    #[test]
    fn test_connect_options_from_discrete_fields() {
        let options = connect_options(&config(None)).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "tracker");
        assert_eq!(options.get_database(), Some("bugs"));
    }

    #[test]
    fn test_connect_options_prefer_url() {
        let options = connect_options(&config(Some("postgres://u@url.host:7000/qa"))).unwrap();
        assert_eq!(options.get_host(), "url.host");
        assert_eq!(options.get_port(), 7000);
        assert_eq!(options.get_database(), Some("qa"));
    }

    #[test]
    fn test_connect_options_invalid_url() {
        let err = connect_options(&config(Some("not a url"))).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }
}
