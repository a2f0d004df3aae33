//! Label repository
//!
//! Label names are unique; duplicates surface as `DataError::Conflict`.

use sqlx::PgPool;

use crate::data::error::DataError;
use crate::data::sparse::SparseUpdate;
use crate::data::types::{LabelRow, new_id};

/// All labels, alphabetically
pub async fn list_labels(pool: &PgPool) -> Result<Vec<LabelRow>, DataError> {
    let rows = sqlx::query_as::<_, LabelRow>("SELECT * FROM labels ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_label(pool: &PgPool, id: &str) -> Result<Option<LabelRow>, DataError> {
    let row = sqlx::query_as::<_, LabelRow>("SELECT * FROM labels WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_label(
    pool: &PgPool,
    name: &str,
    color: Option<&str>,
    description: Option<&str>,
) -> Result<LabelRow, DataError> {
    let row = sqlx::query_as::<_, LabelRow>(
        r#"
        INSERT INTO labels (id, name, color, description)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(new_id("label"))
    .bind(name)
    .bind(color)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Apply a sparse update; `None` when the label does not exist
pub async fn update_label(
    pool: &PgPool,
    id: &str,
    update: SparseUpdate,
) -> Result<Option<LabelRow>, DataError> {
    update.fetch_optional(pool, id).await
}

pub async fn delete_label(pool: &PgPool, id: &str) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM labels WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
