use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct FieldSelection {
    pub id: Uuid,
    pub field_id: Uuid,
    pub value: String,
    pub api_name: String,
    pub is_selected: bool,
}

impl FieldSelection {
    pub async fn create<'e, E>(
        executor: E,
        field_id: Uuid,
        value: &str,
        api_name: &str,
        is_selected: bool,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FieldSelection>(
            r#"INSERT INTO field_selections (id, field_id, value, api_name, is_selected)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, field_id, value, api_name, is_selected"#,
        )
        .bind(Uuid::new_v4())
        .bind(field_id)
        .bind(value)
        .bind(api_name)
        .bind(is_selected)
        .fetch_one(executor)
        .await
    }

    /// Selections of a field in creation order.
    pub async fn find_by_field_id<'e, E>(
        executor: E,
        field_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FieldSelection>(
            r#"SELECT id, field_id, value, api_name, is_selected
               FROM field_selections
               WHERE field_id = $1
               ORDER BY rowid ASC"#,
        )
        .bind(field_id)
        .fetch_all(executor)
        .await
    }

    pub async fn set_selected<'e, E>(
        executor: E,
        id: Uuid,
        is_selected: bool,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE field_selections SET is_selected = $2 WHERE id = $1")
            .bind(id)
            .bind(is_selected)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
