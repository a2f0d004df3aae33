//! User repository for PostgreSQL operations

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::data::error::DataError;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{Role, UserRow, UserStatus, new_id};

/// Fields for a new user; `password_hash` is already bcrypt-hashed
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub status: UserStatus,
    pub avatar: Option<&'a str>,
}

/// Optional filters for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter<'a> {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub search: Option<&'a str>,
}

/// Canonical stored form of an email: trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a new user; a duplicate email (any case) surfaces as `DataError::Conflict`
pub async fn create_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, DataError> {
    let id = new_id("user");

    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, name, email, password, role, status, avatar)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(user.name)
    .bind(normalize_email(user.email))
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .bind(user.status.as_str())
    .bind(user.avatar)
    .fetch_one(pool)
    .await?;

    tracing::debug!(user_id = %row.id, role = %row.role, "User created");
    Ok(row)
}

/// Get a user by ID
pub async fn get_user(pool: &PgPool, id: &str) -> Result<Option<UserRow>, DataError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Get a user by email (case-insensitive)
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DataError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = $1")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

fn push_user_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &UserFilter<'a>) {
    qb.push(" WHERE TRUE");
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
        let pattern = crate::utils::sql::contains_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// List users with filters and pagination, ordered by name
pub async fn list_users(
    pool: &PgPool,
    filter: &UserFilter<'_>,
    page: u32,
    limit: u32,
) -> Result<(Vec<UserRow>, u64), DataError> {
    let offset = page.saturating_sub(1) * limit;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users");
    push_user_filters(&mut qb, filter);
    qb.push(" ORDER BY name ASC, id ASC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(offset as i64);
    let rows = qb.build_query_as::<UserRow>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_user_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((rows, total as u64))
}

/// Apply a sparse update; `None` when the user does not exist
pub async fn update_user(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
) -> Result<Option<UserRow>, DataError> {
    update.fetch_optional(pool, id).await
}

/// Record a successful login
pub async fn touch_last_active(pool: &PgPool, id: &str) -> Result<(), DataError> {
    sqlx::query("UPDATE users SET last_active = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a user; returns false when no row matched
pub async fn delete_user(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Create an Admin, or promote and reactivate an existing account with that email
pub async fn upsert_admin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRow, DataError> {
    let id = new_id("user");

    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, name, email, password, role, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ((LOWER(email))) DO UPDATE SET
            password = EXCLUDED.password,
            role = EXCLUDED.role,
            status = EXCLUDED.status,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(normalize_email(email))
    .bind(password_hash)
    .bind(Role::Admin.as_str())
    .bind(UserStatus::Active.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::postgres::testing::TestDatabase;

    #[test]
    fn test_user_filters_bind_only_supplied_values() {
        let filter = UserFilter {
            role: Some(Role::Qa),
            status: None,
            search: Some("  "),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        push_user_filters(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT * FROM users WHERE TRUE AND role = $1");
    }

    #[test]
    fn test_user_search_matches_name_or_email() {
        let filter = UserFilter {
            search: Some("ana"),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM users WHERE TRUE AND (name ILIKE $1 OR email ILIKE $2)"
        );
    }

    #[tokio::test]
    async fn test_email_uniqueness_ignores_case() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let new_user = |email| NewUser {
            name: "Ana",
            email,
            password_hash: "!",
            role: Role::Qa,
            status: UserStatus::Active,
            avatar: None,
        };

        let created = create_user(db.pool(), new_user("  Ana@Example.COM ")).await.unwrap();
        assert_eq!(created.email, "ana@example.com");

        let err = create_user(db.pool(), new_user("ANA@example.com")).await.unwrap_err();
        assert!(err.is_conflict_on("users_email_unique"), "{err:?}");

        let found = get_user_by_email(db.pool(), "aNa@EXAMPLE.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_upsert_admin_promotes_case_variant_email() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let existing = db.user("Lead", Role::Developer).await;

        let admin = upsert_admin(db.pool(), "Lead", &existing.email.to_uppercase(), "!")
            .await
            .unwrap();
        assert_eq!(admin.id, existing.id);
        assert_eq!(admin.role, Role::Admin.as_str());
        assert_eq!(admin.email, existing.email);

        db.cleanup().await;
    }
}
