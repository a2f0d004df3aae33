use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PORT,
    DEFAULT_DB_USER, DEFAULT_FRONTEND_URL, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_AUTH_RPM, DEFAULT_UPLOAD_DIR, ENV_DB_HOST, ENV_DB_NAME, ENV_DB_PASSWORD,
    ENV_DB_PORT, ENV_DB_USER, ENV_ENVIRONMENT, ENV_SUPABASE_DB_URL, ENVIRONMENT_PRODUCTION,
    MIN_JWT_SECRET_LEN, POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
};

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub frontend_url: Option<String>,
}

/// Authentication configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub jwt_secret: Option<String>,
}

/// Upload configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UploadsFileConfig {
    pub dir: Option<String>,
}

/// Rate limit configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub auth_rpm: Option<u32>,
    pub trust_forwarded_for: Option<bool>,
}

/// PostgreSQL configuration section
///
/// Either `url` or the discrete connection fields may be set.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostgresFileConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    /// Maximum number of connections in the pool (default: 20)
    pub max_connections: Option<u32>,
    /// Minimum number of connections to keep warm (default: 2)
    pub min_connections: Option<u32>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Idle connection timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Max connection lifetime in seconds (default: 1800)
    pub max_lifetime_secs: Option<u64>,
    /// Statement timeout in seconds, 0 to disable (default: 60)
    pub statement_timeout_secs: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub database: Option<PostgresFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub uploads: Option<UploadsFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `$current` with `$other` when the latter is set
macro_rules! merge_field {
    ($current:expr, $other:expr, $name:literal) => {
        if $other.is_some() {
            tracing::trace!(value = ?$other, concat!("Merging ", $name));
            $current = $other;
        }
    };
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_field!(current.host, server.host, "server.host");
            merge_field!(current.port, server.port, "server.port");
            merge_field!(current.frontend_url, server.frontend_url, "server.frontend_url");
        }

        if let Some(db) = other.database {
            let current = self.database.get_or_insert_with(PostgresFileConfig::default);
            merge_field!(current.url, db.url, "database.url");
            merge_field!(current.host, db.host, "database.host");
            merge_field!(current.port, db.port, "database.port");
            merge_field!(current.user, db.user, "database.user");
            if db.password.is_some() {
                tracing::trace!("Merging database.password");
                current.password = db.password;
            }
            merge_field!(current.name, db.name, "database.name");
            merge_field!(
                current.max_connections,
                db.max_connections,
                "database.max_connections"
            );
            merge_field!(
                current.min_connections,
                db.min_connections,
                "database.min_connections"
            );
            merge_field!(
                current.acquire_timeout_secs,
                db.acquire_timeout_secs,
                "database.acquire_timeout_secs"
            );
            merge_field!(
                current.idle_timeout_secs,
                db.idle_timeout_secs,
                "database.idle_timeout_secs"
            );
            merge_field!(
                current.max_lifetime_secs,
                db.max_lifetime_secs,
                "database.max_lifetime_secs"
            );
            merge_field!(
                current.statement_timeout_secs,
                db.statement_timeout_secs,
                "database.statement_timeout_secs"
            );
        }

        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            if auth.jwt_secret.is_some() {
                tracing::trace!("Merging auth.jwt_secret");
                current.jwt_secret = auth.jwt_secret;
            }
        }

        if let Some(uploads) = other.uploads {
            let current = self.uploads.get_or_insert_with(UploadsFileConfig::default);
            merge_field!(current.dir, uploads.dir, "uploads.dir");
        }

        if let Some(rate_limit) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            merge_field!(current.enabled, rate_limit.enabled, "rate_limit.enabled");
            merge_field!(current.auth_rpm, rate_limit.auth_rpm, "rate_limit.auth_rpm");
            merge_field!(
                current.trust_forwarded_for,
                rate_limit.trust_forwarded_for,
                "rate_limit.trust_forwarded_for"
            );
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

/// PostgreSQL connection and pool settings
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Full connection URL; when absent the discrete fields are used
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub statement_timeout_secs: u64,
}

#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Signing secret; a random one is generated at startup when unset
    pub jwt_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UploadsConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth_rpm: u32,
    /// Use the first `X-Forwarded-For` hop as the client address
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub auth: AuthConfig,
    pub uploads: UploadsConfig,
    pub rate_limit: RateLimitConfig,
    /// Production mode hides internal error details from API responses
    pub production: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.qatrack/qatrack.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Self::load_with_env(cli, |key| std::env::var(key).ok())
    }

    /// Load configuration with an explicit environment lookup
    pub fn load_with_env<F>(cli: &CliConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config, &env)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn resolve<F>(cli: &CliConfig, file_config: FileConfig, env: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_server = file_config.server.unwrap_or_default();
        let file_db = file_config.database.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_uploads = file_config.uploads.unwrap_or_default();
        let file_rate_limit = file_config.rate_limit.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            frontend_url: cli
                .frontend_url
                .clone()
                .or(file_server.frontend_url)
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
        };

        // DATABASE_URL (via clap) wins, then the file, then the managed-Postgres URL
        let url = cli
            .database_url
            .clone()
            .or(file_db.url)
            .or_else(|| env(ENV_SUPABASE_DB_URL))
            .filter(|u| !u.trim().is_empty());

        let db_port = match env(ENV_DB_PORT) {
            Some(p) => Some(
                p.parse::<u16>()
                    .with_context(|| format!("Invalid {}: {}", ENV_DB_PORT, p))?,
            ),
            None => None,
        };

        let database = PostgresConfig {
            url,
            host: env(ENV_DB_HOST)
                .or(file_db.host)
                .unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: db_port.or(file_db.port).unwrap_or(DEFAULT_DB_PORT),
            user: env(ENV_DB_USER)
                .or(file_db.user)
                .unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
            password: env(ENV_DB_PASSWORD).or(file_db.password),
            name: env(ENV_DB_NAME)
                .or(file_db.name)
                .unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            max_connections: file_db
                .max_connections
                .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
            min_connections: file_db
                .min_connections
                .unwrap_or(POSTGRES_DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: file_db
                .acquire_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout_secs: file_db
                .idle_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS),
            max_lifetime_secs: file_db
                .max_lifetime_secs
                .unwrap_or(POSTGRES_DEFAULT_MAX_LIFETIME_SECS),
            statement_timeout_secs: file_db
                .statement_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
        };

        let auth = AuthConfig {
            jwt_secret: cli
                .jwt_secret
                .clone()
                .or(file_auth.jwt_secret)
                .filter(|s| !s.is_empty()),
        };

        let uploads = UploadsConfig {
            dir: cli
                .upload_dir
                .clone()
                .or_else(|| file_uploads.dir.map(|d| expand_path(&d)))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        };

        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rate_limit.enabled)
                .unwrap_or(true),
            auth_rpm: cli
                .rate_limit_auth_rpm
                .or(file_rate_limit.auth_rpm)
                .unwrap_or(DEFAULT_RATE_LIMIT_AUTH_RPM),
            trust_forwarded_for: cli
                .rate_limit_trust_forwarded_for
                .or(file_rate_limit.trust_forwarded_for)
                .unwrap_or(false),
        };

        let production = env(ENV_ENVIRONMENT)
            .is_some_and(|v| v.eq_ignore_ascii_case(ENVIRONMENT_PRODUCTION));

        Ok(Self {
            server,
            database,
            auth,
            uploads,
            rate_limit,
            production,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.server.frontend_url.is_empty() {
            anyhow::bail!("Configuration error: server.frontend_url must not be empty");
        }

        if self.production {
            match &self.auth.jwt_secret {
                None => anyhow::bail!("Configuration error: JWT_SECRET is required in production"),
                Some(s) if s.len() < MIN_JWT_SECRET_LEN => anyhow::bail!(
                    "Configuration error: JWT_SECRET must be at least {} bytes in production",
                    MIN_JWT_SECRET_LEN
                ),
                Some(_) => {}
            }
        }

        if self.rate_limit.enabled && self.rate_limit.auth_rpm == 0 {
            tracing::warn!("rate_limit.auth_rpm is 0, all auth requests will be blocked");
        }

        Ok(())
    }
}

/// Get the profile config path (~/.qatrack/qatrack.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "127.0.0.1", "port": 8080, "frontend_url": "http://qa.local" },
            "database": { "url": "postgres://u:p@db/qa", "max_connections": 5 },
            "uploads": { "dir": "/var/qa/uploads" },
            "rate_limit": { "enabled": false }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.frontend_url.as_deref(), Some("http://qa.local"));
        let db = config.database.as_ref().unwrap();
        assert_eq!(db.url.as_deref(), Some("postgres://u:p@db/qa"));
        assert_eq!(db.max_connections, Some(5));
        assert_eq!(config.rate_limit.as_ref().unwrap().enabled, Some(false));
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "port": 1 }, "sevrer": {} }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        let serde_json::Value::Object(map) = &config.extra else {
            panic!("extra should be an object");
        };
        assert!(map.contains_key("sevrer"));
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "server": { "host": "10.0.0.1", "port": 4000 }, "database": { "name": "base" } }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{ "server": { "port": 4001 }, "database": { "user": "qa" } }"#,
        )
        .unwrap();
        base.merge(overlay);

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("10.0.0.1"));
        assert_eq!(server.port, Some(4001));
        let db = base.database.unwrap();
        assert_eq!(db.name.as_deref(), Some("base"));
        assert_eq!(db.user.as_deref(), Some("qa"));
    }

    #[test]
    fn test_resolve_defaults() {
        let config =
            AppConfig::resolve(&CliConfig::default(), FileConfig::default(), &no_env).unwrap();

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.frontend_url, DEFAULT_FRONTEND_URL);
        assert!(config.database.url.is_none());
        assert_eq!(config.database.host, DEFAULT_DB_HOST);
        assert_eq!(config.database.port, DEFAULT_DB_PORT);
        assert_eq!(config.database.name, DEFAULT_DB_NAME);
        assert_eq!(
            config.database.max_connections,
            POSTGRES_DEFAULT_MAX_CONNECTIONS
        );
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.uploads.dir, PathBuf::from(DEFAULT_UPLOAD_DIR));
        assert!(config.rate_limit.enabled);
        assert!(!config.rate_limit.trust_forwarded_for);
        assert!(!config.production);
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "server": { "host": "file.host", "port": 4000 }, "auth": { "jwt_secret": "from-file" } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            port: Some(3000),
            jwt_secret: Some("from-cli".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, file, &no_env).unwrap();

        assert_eq!(config.server.host, "file.host");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_resolve_discrete_database_env() {
        let env = env_from(&[
            (ENV_DB_HOST, "db.internal"),
            (ENV_DB_PORT, "6543"),
            (ENV_DB_USER, "tracker"),
            (ENV_DB_PASSWORD, "hunter2"),
            (ENV_DB_NAME, "bugs"),
        ]);
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default(), &env).unwrap();

        assert!(config.database.url.is_none());
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.user, "tracker");
        assert_eq!(config.database.password.as_deref(), Some("hunter2"));
        assert_eq!(config.database.name, "bugs");
    }

    #[test]
    fn test_resolve_invalid_db_port() {
        let env = env_from(&[(ENV_DB_PORT, "not-a-port")]);
        assert!(AppConfig::resolve(&CliConfig::default(), FileConfig::default(), &env).is_err());
    }

    #[test]
    fn test_resolve_supabase_url_fallback() {
        let env = env_from(&[(ENV_SUPABASE_DB_URL, "postgres://supabase/db")]);
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default(), &env).unwrap();
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://supabase/db")
        );

        let cli = CliConfig {
            database_url: Some("postgres://primary/db".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default(), &env).unwrap();
        assert_eq!(config.database.url.as_deref(), Some("postgres://primary/db"));
    }

    #[test]
    fn test_validation_empty_host() {
        let cli = CliConfig {
            host: Some(String::new()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default(), &no_env).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_port_zero() {
        let cli = CliConfig {
            port: Some(0),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default(), &no_env).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_production_requires_secret() {
        let env = env_from(&[(ENV_ENVIRONMENT, "production")]);
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default(), &env).unwrap();
        assert!(config.production);
        assert!(config.validate().is_err());

        let cli = CliConfig {
            jwt_secret: Some("short".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default(), &env).unwrap();
        assert!(config.validate().is_err());

        let cli = CliConfig {
            jwt_secret: Some("a-sufficiently-long-secret".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default(), &env).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let auth = AuthConfig {
            jwt_secret: Some("top-secret".to_string()),
        };
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(!is_all_interfaces("127.0.0.1"));
    }
}
