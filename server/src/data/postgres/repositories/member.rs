//! Project membership repository for PostgreSQL operations

use sqlx::{Executor, PgPool, Postgres};

use crate::data::error::DataError;
use crate::data::types::MemberWithUser;

use super::activity::insert_activity;

const MEMBER_SELECT: &str = r#"
SELECT pm.project_id, pm.user_id, pm.role, pm.joined_at,
    u.name, u.email, u.role AS user_role, u.avatar
FROM project_members pm
JOIN users u ON u.id = pm.user_id"#;

/// Check if a user is a member of a project
pub async fn is_member<'e, E>(executor: E, project_id: &str, user_id: &str) -> Result<bool, DataError>
where
    E: Executor<'e, Database = Postgres>,
{
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2)",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

/// Members of one project, oldest first
pub async fn list_members(pool: &PgPool, project_id: &str) -> Result<Vec<MemberWithUser>, DataError> {
    let sql = format!("{} WHERE pm.project_id = $1 ORDER BY pm.joined_at ASC", MEMBER_SELECT);
    let rows = sqlx::query_as::<_, MemberWithUser>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Members of several projects in one query
pub async fn list_members_for_projects(
    pool: &PgPool,
    project_ids: &[String],
) -> Result<Vec<MemberWithUser>, DataError> {
    if project_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{} WHERE pm.project_id = ANY($1) ORDER BY pm.project_id, pm.joined_at ASC",
        MEMBER_SELECT
    );
    let rows = sqlx::query_as::<_, MemberWithUser>(&sql)
        .bind(project_ids)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Add a member or relabel an existing one, log it, and return the joined row
///
/// The upsert, the activity and the re-read share one transaction.
pub async fn add_member(
    pool: &PgPool,
    project_id: &str,
    user_id: &str,
    role: &str,
    actor_id: &str,
) -> Result<MemberWithUser, DataError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (project_id, user_id) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role)
    .execute(&mut *tx)
    .await?;

    let sql = format!("{} WHERE pm.project_id = $1 AND pm.user_id = $2", MEMBER_SELECT);
    let member = sqlx::query_as::<_, MemberWithUser>(&sql)
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    insert_activity(
        &mut *tx,
        project_id,
        Some(actor_id),
        &format!("added {} to the project as {}", member.name, role),
        None,
    )
    .await?;

    tx.commit().await?;
    Ok(member)
}

/// Remove a member and log it; returns false when not a member
pub async fn remove_member(
    pool: &PgPool,
    project_id: &str,
    user_id: &str,
    actor_id: &str,
) -> Result<bool, DataError> {
    let mut tx = pool.begin().await?;

    let removed: Option<String> = sqlx::query_scalar(
        r#"
        DELETE FROM project_members pm
        USING users u
        WHERE pm.project_id = $1 AND pm.user_id = $2 AND u.id = pm.user_id
        RETURNING u.name
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(name) = removed else {
        return Ok(false);
    };

    insert_activity(
        &mut *tx,
        project_id,
        Some(actor_id),
        &format!("removed {} from the project", name),
        None,
    )
    .await?;

    tx.commit().await?;
    Ok(true)
}
