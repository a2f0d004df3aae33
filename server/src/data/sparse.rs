//! Sparse UPDATE builder
//!
//! Builds `UPDATE <table> SET c1 = $1, ..., updated_at = NOW() WHERE id = $n
//! RETURNING *` from the subset of columns a request actually supplied.
//! Column names always come from the caller's static allow-list, never from
//! request input; values are bound positionally.

use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{Executor, FromRow, Postgres};

use super::error::DataError;

/// A value bound to one `column = $n` assignment
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int(Option<i32>),
    Date(Option<NaiveDate>),
    Json(serde_json::Value),
    TextArray(Vec<String>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        Self::Text(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(Some(v))
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(Some(v))
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        Self::Date(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        Self::TextArray(v)
    }
}

/// Partial update of a single row identified by `id`
#[derive(Debug, Clone)]
pub struct SparseUpdate {
    table: &'static str,
    assignments: Vec<(&'static str, SqlValue)>,
}

impl SparseUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
        }
    }

    /// Set `column` when the field was supplied; `None` leaves it untouched
    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.assignments.push((column, v.into()));
        }
        self
    }

    /// Three-state nullable field: absent, explicit null (clears), or a value
    pub fn set_nullable<V>(mut self, column: &'static str, value: Option<Option<V>>) -> Self
    where
        Option<V>: Into<SqlValue>,
    {
        if let Some(v) = value {
            self.assignments.push((column, v.into()));
        }
        self
    }

    /// Append an assignment that is always applied
    pub fn push<V: Into<SqlValue>>(mut self, column: &'static str, value: V) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Columns that will be written, in bind order
    pub fn columns(&self) -> Vec<&'static str> {
        self.assignments.iter().map(|(c, _)| *c).collect()
    }

    /// Value staged for `column`, if any
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.assignments
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    /// Render the statement; the row id is bound last
    pub fn sql(&self) -> Result<String, DataError> {
        if self.is_empty() {
            return Err(DataError::EmptyUpdate);
        }

        let mut sets: Vec<String> = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ${}", column, i + 1))
            .collect();
        sets.push("updated_at = NOW()".to_string());

        Ok(format!(
            "UPDATE {} SET {} WHERE id = ${} RETURNING *",
            self.table,
            sets.join(", "),
            self.assignments.len() + 1
        ))
    }

    /// Execute the update and map the returned row, `None` when no row matched
    pub async fn fetch_optional<'e, T, E>(self, executor: E, id: &str) -> Result<Option<T>, DataError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: Executor<'e, Database = Postgres>,
    {
        let sql = self.sql()?;
        tracing::trace!(table = self.table, columns = ?self.columns(), "Sparse update");

        let mut query = sqlx::query_as::<_, T>(&sql);
        for (_, value) in self.assignments {
            query = match value {
                SqlValue::Text(v) => query.bind(v),
                SqlValue::Int(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
                SqlValue::Json(v) => query.bind(v),
                SqlValue::TextArray(v) => query.bind(v),
            };
        }

        let row = query.bind(id).fetch_optional(executor).await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_supplied_columns_are_written() {
        let update = SparseUpdate::new("issues")
            .set("title", None::<String>)
            .set("status", Some("Fixed"))
            .set("severity", None::<String>);

        assert_eq!(update.columns(), vec!["status"]);
        assert_eq!(
            update.sql().unwrap(),
            "UPDATE issues SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *"
        );
    }

    #[test]
    fn test_positional_numbering_follows_insertion_order() {
        let update = SparseUpdate::new("projects")
            .set("name", Some("Apollo".to_string()))
            .set("description", Some("Launch".to_string()))
            .set_nullable("end_date", Some(None::<NaiveDate>));

        assert_eq!(
            update.sql().unwrap(),
            "UPDATE projects SET name = $1, description = $2, end_date = $3, \
             updated_at = NOW() WHERE id = $4 RETURNING *"
        );
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let update = SparseUpdate::new("users").set("name", None::<String>);
        assert!(update.is_empty());
        assert!(matches!(update.sql(), Err(DataError::EmptyUpdate)));
    }

    #[test]
    fn test_nullable_distinguishes_absent_from_null() {
        let absent = SparseUpdate::new("issues").set_nullable("assigned_to", None::<Option<String>>);
        assert!(absent.is_empty());

        let cleared =
            SparseUpdate::new("issues").set_nullable("assigned_to", Some(None::<String>));
        assert_eq!(cleared.value("assigned_to"), Some(&SqlValue::Text(None)));

        let set = SparseUpdate::new("issues")
            .set_nullable("assigned_to", Some(Some("user-1".to_string())));
        assert_eq!(
            set.value("assigned_to"),
            Some(&SqlValue::Text(Some("user-1".to_string())))
        );
    }

    #[test]
    fn test_push_always_applies() {
        let update = SparseUpdate::new("issues").push("screenshots", vec!["/uploads/a.png".to_string()]);
        assert_eq!(update.columns(), vec!["screenshots"]);
    }
}
