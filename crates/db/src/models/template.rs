use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::task_field::FieldType;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTemplate {
    pub account_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub owner_ids: Vec<Uuid>,
}

impl Template {
    pub async fn create(pool: &SqlitePool, data: &CreateTemplate) -> Result<Self, sqlx::Error> {
        let template = sqlx::query_as::<_, Template>(
            r#"INSERT INTO templates (id, account_id, name, is_active, is_deleted, created_at)
               VALUES ($1, $2, $3, $4, 0, $5)
               RETURNING id, account_id, name, is_active, is_deleted, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.account_id)
        .bind(&data.name)
        .bind(data.is_active)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        for owner_id in &data.owner_ids {
            Self::add_owner(pool, template.id, *owner_id).await?;
        }
        Ok(template)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Template>(
            r#"SELECT id, account_id, name, is_active, is_deleted, created_at
               FROM templates
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Template the user owns inside their account, deleted or not.
    pub async fn find_owned(
        pool: &SqlitePool,
        id: Uuid,
        account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Template>(
            r#"SELECT t.id, t.account_id, t.name, t.is_active, t.is_deleted, t.created_at
               FROM templates t
               JOIN template_owners o ON o.template_id = t.id
               WHERE t.id = $1 AND t.account_id = $2 AND o.user_id = $3"#,
        )
        .bind(id)
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn owner_ids(pool: &SqlitePool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM template_owners WHERE template_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    pub async fn add_owner(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO template_owners (template_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Soft delete: existing workflows keep counting as legacy workflows.
    pub async fn mark_deleted(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE templates SET is_deleted = 1, is_active = 0 WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct TemplateTask {
    pub id: Uuid,
    pub template_id: Uuid,
    pub number: i64,
    pub name: String,
    pub api_name: String,
    pub due_in_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTemplateTask {
    pub template_id: Uuid,
    pub number: i64,
    pub name: String,
    pub api_name: String,
    pub due_in_minutes: Option<i64>,
}

impl TemplateTask {
    pub async fn create(pool: &SqlitePool, data: &CreateTemplateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TemplateTask>(
            r#"INSERT INTO template_tasks (id, template_id, number, name, api_name, due_in_minutes)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, template_id, number, name, api_name, due_in_minutes"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.template_id)
        .bind(data.number)
        .bind(&data.name)
        .bind(&data.api_name)
        .bind(data.due_in_minutes)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TemplateTask>(
            r#"SELECT id, template_id, number, name, api_name, due_in_minutes
               FROM template_tasks
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_template_id<'e, E>(
        executor: E,
        template_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TemplateTask>(
            r#"SELECT id, template_id, number, name, api_name, due_in_minutes
               FROM template_tasks
               WHERE template_id = $1
               ORDER BY number ASC"#,
        )
        .bind(template_id)
        .fetch_all(executor)
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct FieldTemplate {
    pub id: Uuid,
    pub template_id: Uuid,
    pub task_template_id: Option<Uuid>,
    pub field_type: FieldType,
    pub name: String,
    pub description: String,
    pub api_name: String,
    pub order: i64,
    pub is_required: bool,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateFieldTemplate {
    pub template_id: Uuid,
    /// `None` places the field on the kickoff form.
    pub task_template_id: Option<Uuid>,
    pub field_type: FieldType,
    pub name: String,
    pub description: String,
    pub api_name: String,
    pub order: i64,
    pub is_required: bool,
}

const FIELD_TEMPLATE_COLUMNS: &str = r#"id, template_id, task_template_id, field_type, name,
    description, api_name, "order", is_required"#;

impl FieldTemplate {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateFieldTemplate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FieldTemplate>(&format!(
            r#"INSERT INTO field_templates (id, template_id, task_template_id, field_type, name,
                   description, api_name, "order", is_required)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {FIELD_TEMPLATE_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(data.template_id)
        .bind(data.task_template_id)
        .bind(data.field_type)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.api_name)
        .bind(data.order)
        .bind(data.is_required)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_task_template_id<'e, E>(
        executor: E,
        task_template_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FieldTemplate>(&format!(
            r#"SELECT {FIELD_TEMPLATE_COLUMNS} FROM field_templates
               WHERE task_template_id = $1
               ORDER BY "order" ASC, rowid ASC"#
        ))
        .bind(task_template_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_kickoff_fields<'e, E>(
        executor: E,
        template_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FieldTemplate>(&format!(
            r#"SELECT {FIELD_TEMPLATE_COLUMNS} FROM field_templates
               WHERE template_id = $1 AND task_template_id IS NULL
               ORDER BY "order" ASC, rowid ASC"#
        ))
        .bind(template_id)
        .fetch_all(executor)
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct FieldTemplateSelection {
    pub id: Uuid,
    pub field_template_id: Uuid,
    pub value: String,
    pub api_name: String,
}

impl FieldTemplateSelection {
    pub async fn create(
        pool: &SqlitePool,
        field_template_id: Uuid,
        value: &str,
        api_name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FieldTemplateSelection>(
            r#"INSERT INTO field_template_selections (id, field_template_id, value, api_name, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, field_template_id, value, api_name"#,
        )
        .bind(Uuid::new_v4())
        .bind(field_template_id)
        .bind(value)
        .bind(api_name)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_field_template_id<'e, E>(
        executor: E,
        field_template_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, FieldTemplateSelection>(
            r#"SELECT id, field_template_id, value, api_name
               FROM field_template_selections
               WHERE field_template_id = $1
               ORDER BY rowid ASC"#,
        )
        .bind(field_template_id)
        .fetch_all(executor)
        .await
    }
}
