//! Scratch PostgreSQL schemas for tests
//!
//! `TestDatabase::connect` returns `None` unless `QATRACK_TEST_DATABASE_URL`
//! or `DATABASE_URL` is set, and tests return early in that case. Each call
//! creates a private schema, migrates it from scratch and points the pool's
//! `search_path` at it; `cleanup` drops it again.

use std::sync::Arc;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};

use super::PostgresService;
use super::migrations;
use super::repositories::user::{self, NewUser};
use crate::data::types::{Role, UserRow, UserStatus};

/// Preferred over `DATABASE_URL` so tests never touch a development database by accident
pub const ENV_TEST_DATABASE_URL: &str = "QATRACK_TEST_DATABASE_URL";

pub struct TestDatabase {
    pub service: Arc<PostgresService>,
    schema: String,
}

impl TestDatabase {
    pub async fn connect() -> Option<Self> {
        let url = std::env::var(ENV_TEST_DATABASE_URL)
            .or_else(|_| std::env::var("DATABASE_URL"))
            .ok()?;
        let options: PgConnectOptions = url.parse().expect("invalid test database URL");
        let schema = format!("qatrack_test_{}", cuid2::create_id());

        let mut conn = PgConnection::connect_with(&options)
            .await
            .expect("connect to test database");
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&mut conn)
            .await
            .expect("create test schema");
        conn.close().await.ok();

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options.options([("search_path", schema.as_str())]))
            .await
            .expect("connect test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("migrate test schema");

        Some(Self {
            service: Arc::new(PostgresService { pool }),
            schema,
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.service.pool()
    }

    /// Active user with a unique email and an unusable password hash
    pub async fn user(&self, name: &str, role: Role) -> UserRow {
        let email = format!("{}.{}@example.com", name.to_lowercase(), cuid2::create_id());
        user::create_user(
            self.pool(),
            NewUser {
                name,
                email: &email,
                password_hash: "!",
                role,
                status: UserStatus::Active,
                avatar: None,
            },
        )
        .await
        .expect("seed user")
    }

    /// Project with a caller-chosen id, optionally with one member
    pub async fn project_with_id(&self, id: &str, member: Option<&UserRow>) {
        sqlx::query("INSERT INTO projects (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(format!("Project {}", id))
            .execute(self.pool())
            .await
            .expect("seed project");
        if let Some(member) = member {
            sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
                .bind(id)
                .bind(&member.id)
                .execute(self.pool())
                .await
                .expect("seed member");
        }
    }

    pub async fn cleanup(self) {
        let drop = format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema);
        if let Err(e) = sqlx::query(&drop).execute(self.service.pool()).await {
            eprintln!("failed to drop test schema {}: {}", self.schema, e);
        }
        self.service.close().await;
    }
}
