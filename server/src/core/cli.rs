use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_DATABASE_URL, ENV_FRONTEND_URL, ENV_HOST, ENV_JWT_SECRET, ENV_PORT,
    ENV_RATE_LIMIT_AUTH_RPM, ENV_RATE_LIMIT_ENABLED, ENV_RATE_LIMIT_TRUST_FORWARDED_FOR,
    ENV_UPLOAD_DIR,
};

#[derive(Parser)]
#[command(name = "qatrack")]
#[command(version, about = "QA bug tracking server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// PostgreSQL connection URL
    #[arg(long, global = true, env = ENV_DATABASE_URL, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Secret used to sign session tokens
    #[arg(long, global = true, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Frontend origin allowed by CORS
    #[arg(long, global = true, env = ENV_FRONTEND_URL)]
    pub frontend_url: Option<String>,

    /// Directory for uploaded attachments
    #[arg(long, global = true, env = ENV_UPLOAD_DIR)]
    pub upload_dir: Option<PathBuf>,

    /// Enable or disable rate limiting on auth endpoints
    #[arg(long, global = true, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// Auth rate limit (requests per minute per IP)
    #[arg(long, global = true, env = ENV_RATE_LIMIT_AUTH_RPM)]
    pub rate_limit_auth_rpm: Option<u32>,

    /// Key the auth rate limit on X-Forwarded-For (only behind a trusted proxy)
    #[arg(long, global = true, env = ENV_RATE_LIMIT_TRUST_FORWARDED_FOR)]
    pub rate_limit_trust_forwarded_for: Option<bool>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create an Admin account (or promote an existing one) and exit
    CreateAdmin {
        /// Admin email address
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long, default_value = "Administrator")]
        name: String,
        /// Initial password
        #[arg(long)]
        password: String,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub frontend_url: Option<String>,
    pub upload_dir: Option<PathBuf>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_auth_rpm: Option<u32>,
    pub rate_limit_trust_forwarded_for: Option<bool>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            database_url: cli.database_url,
            jwt_secret: cli.jwt_secret,
            frontend_url: cli.frontend_url,
            upload_dir: cli.upload_dir,
            rate_limit_enabled: cli.rate_limit_enabled,
            rate_limit_auth_rpm: cli.rate_limit_auth_rpm,
            rate_limit_trust_forwarded_for: cli.rate_limit_trust_forwarded_for,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (CliConfig::from(cli), command)
}
