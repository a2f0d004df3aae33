//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::auth::{AuthManager, AuthState, require_auth};
use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::rate_limit::{RateLimiter, rate_limit_middleware};
use super::routes::{
    activities, auth, comments, epics, health, issue_types, issues, labels, projects, sprints,
    users,
};
use crate::core::CoreApp;
use crate::core::constants::{AUTH_BODY_LIMIT, DEFAULT_BODY_LIMIT, UPLOADS_URL_PREFIX};
use crate::data::PostgresService;
use crate::data::files::UploadService;

/// Everything the router needs, independent of the running app
#[derive(Clone)]
pub(crate) struct RouterDeps {
    pub auth_manager: Arc<AuthManager>,
    pub database: Arc<PostgresService>,
    pub uploads: Arc<UploadService>,
    pub allowed_origins: AllowedOrigins,
    /// Per-IP limiter for the auth routes; `None` disables it
    pub auth_rate_limit: Option<RateLimiter>,
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let deps = RouterDeps {
            auth_manager: app.auth.clone(),
            database: app.database.clone(),
            uploads: app.uploads.clone(),
            allowed_origins: AllowedOrigins::new(&app.config.server.frontend_url),
            auth_rate_limit: app
                .config
                .rate_limit
                .enabled
                .then(|| {
                    RateLimiter::per_minute(app.config.rate_limit.auth_rpm)
                        .trust_forwarded_for(app.config.rate_limit.trust_forwarded_for)
                }),
        };
        let router = build_router(deps);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Assemble the full HTTP surface
pub(crate) fn build_router(deps: RouterDeps) -> Router {
    let RouterDeps {
        auth_manager,
        database,
        uploads,
        allowed_origins,
        auth_rate_limit,
    } = deps;

    let auth_state = AuthState {
        auth_manager: auth_manager.clone(),
        database: database.clone(),
    };
    let protected = |routes: Router| {
        routes.layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ))
    };

    // Login and register are public; rate limited by IP against brute force
    let auth_routes =
        auth::routes(auth_manager, database.clone()).layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT));
    let auth_routes = match auth_rate_limit {
        Some(limiter) => auth_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        )),
        None => auth_routes,
    };

    let upload_files = ServeDir::new(uploads.dir());

    Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/docs", get(swagger_ui_html))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", protected(users::routes(database.clone())))
        .nest(
            "/api/projects",
            protected(projects::routes(database.clone(), uploads.clone())),
        )
        .nest(
            "/api/issues",
            protected(issues::routes(database.clone(), uploads)),
        )
        .nest("/api/comments", protected(comments::routes(database.clone())))
        .nest(
            "/api/activities",
            protected(activities::routes(database.clone())),
        )
        .nest("/api/sprints", protected(sprints::routes(database.clone())))
        .nest("/api/epics", protected(epics::routes(database.clone())))
        .nest("/api/labels", protected(labels::routes(database.clone())))
        .nest("/api/issue-types", protected(issue_types::routes(database)))
        .nest_service(UPLOADS_URL_PREFIX, upload_files)
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(middleware::cors(&allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}
