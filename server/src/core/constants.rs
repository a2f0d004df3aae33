// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "QATrack";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "qatrack";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".qatrack";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "qatrack.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "QATRACK_CONFIG";

/// Environment variable for the deployment environment (`production` hides error details)
pub const ENV_ENVIRONMENT: &str = "QATRACK_ENV";

/// Environment value that enables production behaviour
pub const ENVIRONMENT_PRODUCTION: &str = "production";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "QATRACK_LOG";

/// Environment variable for the frontend origin allowed by CORS
pub const ENV_FRONTEND_URL: &str = "FRONTEND_URL";

/// Environment variable for the attachment upload directory
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default frontend origin
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Default upload directory (relative to the working directory)
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Public URL prefix for uploaded attachments
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Full PostgreSQL connection URL
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Managed Postgres (Supabase) connection URL, used when DATABASE_URL is unset
pub const ENV_SUPABASE_DB_URL: &str = "SUPABASE_DB_URL";

/// Discrete connection variables, used when no URL is given
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_NAME: &str = "DB_NAME";

/// Defaults for discrete connection variables
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_NAME: &str = "qa_tracker";

// =============================================================================
// PostgreSQL Pool Defaults
// =============================================================================

/// Maximum connections in the pool
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Minimum connections kept warm
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Connection acquire timeout in seconds
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Idle connection timeout in seconds
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Maximum connection lifetime in seconds
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Statement timeout in seconds
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Authentication
// =============================================================================

/// Environment variable for the JWT signing secret
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";

/// Minimum JWT secret length accepted in production
pub const MIN_JWT_SECRET_LEN: usize = 16;

/// Session token lifetime in hours
pub const TOKEN_TTL_HOURS: i64 = 24;

/// bcrypt cost factor for password hashes
pub const BCRYPT_COST: u32 = 10;

/// Minimum password length for new accounts
pub const MIN_PASSWORD_LEN: u64 = 6;

// =============================================================================
// Rate Limiting
// =============================================================================

/// Environment variable to enable or disable the login rate limiter
pub const ENV_RATE_LIMIT_ENABLED: &str = "QATRACK_RATE_LIMIT_ENABLED";

/// Environment variable for auth requests per minute per IP
pub const ENV_RATE_LIMIT_AUTH_RPM: &str = "QATRACK_RATE_LIMIT_AUTH_RPM";

/// Environment variable to key the limiter on `X-Forwarded-For`
pub const ENV_RATE_LIMIT_TRUST_FORWARDED_FOR: &str = "QATRACK_RATE_LIMIT_TRUST_FORWARDED_FOR";

/// Default auth requests per minute per IP
pub const DEFAULT_RATE_LIMIT_AUTH_RPM: u32 = 20;

/// Fixed window length in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Maximum distinct clients tracked by the limiter
pub const RATE_LIMIT_MAX_CLIENTS: u64 = 100_000;

// =============================================================================
// Request Limits
// =============================================================================

/// Default request body limit (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Auth request body limit (64 KB)
pub const AUTH_BODY_LIMIT: usize = 64 * 1024;

/// Maximum attachments per issue request
pub const MAX_ATTACHMENTS: usize = 10;

/// Maximum size of a single attachment (10 MB)
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Issue request body limit (room for all attachments plus the JSON part)
pub const ISSUE_BODY_LIMIT: usize = MAX_ATTACHMENTS * MAX_ATTACHMENT_BYTES + DEFAULT_BODY_LIMIT;

// =============================================================================
// Issues
// =============================================================================

/// Prefix of human-readable bug identifiers
pub const BUG_ID_PREFIX: &str = "BUG";

/// Number of project id characters used in a bug identifier
pub const BUG_ID_SUFFIX_LEN: usize = 4;

/// Attempts made to allocate a bug identifier before giving up
pub const BUG_ID_MAX_ATTEMPTS: u32 = 3;

/// Base backoff between bug identifier allocation attempts
pub const BUG_ID_RETRY_BASE_DELAY_MS: u64 = 25;

/// Default number of activity entries returned for a project
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;

// =============================================================================
// Shutdown
// =============================================================================

/// Seconds to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
