//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::auth::password::hash_password;
use crate::api::routes::users::types::validate_password;
use crate::api::types::set_expose_error_details;
use crate::api::{ApiServer, AuthManager};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::PostgresService;
use crate::data::files::UploadService;
use crate::data::postgres::repositories::user;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<PostgresService>,
    pub auth: Arc<AuthManager>,
    pub uploads: Arc<UploadService>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Migrate) => Self::migrate(&cli_config).await,
            Some(Commands::CreateAdmin {
                email,
                name,
                password,
            }) => Self::create_admin(&cli_config, &email, &name, &password).await,
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        set_expose_error_details(!config.production);

        let database = Arc::new(
            PostgresService::init(&config.database)
                .await
                .context("Failed to initialize database")?,
        );
        let auth = Arc::new(AuthManager::init(&config.auth, config.production)?);

        tokio::fs::create_dir_all(&config.uploads.dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create upload directory: {}",
                    config.uploads.dir.display()
                )
            })?;
        let uploads = Arc::new(UploadService::filesystem(config.uploads.dir.clone()));

        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            database,
            auth,
            uploads,
        })
    }

    /// Connect, apply pending migrations, and exit
    async fn migrate(cli: &CliConfig) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let database = PostgresService::init(&config.database)
            .await
            .context("Failed to apply migrations")?;
        database.close().await;

        println!("Migrations applied.");
        Ok(())
    }

    /// Create an Admin account, or promote an existing one
    async fn create_admin(cli: &CliConfig, email: &str, name: &str, password: &str) -> Result<()> {
        validate_password(password).map_err(|e| anyhow::anyhow!("{}", e))?;

        let config = AppConfig::load(cli)?;
        let database = PostgresService::init(&config.database)
            .await
            .context("Failed to initialize database")?;

        let hash = hash_password(password).await?;
        let admin = user::upsert_admin(database.pool(), name, email, &hash)
            .await
            .context("Failed to create admin")?;
        database.close().await;

        tracing::info!(user_id = %admin.id, "Admin account ready");
        println!("Admin account ready: {} ({})", admin.email, admin.id);
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            uploads = %app.config.uploads.dir.display(),
            production = app.config.production,
            "{} starting",
            APP_NAME
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_health_check_task(self.shutdown.subscribe()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}
