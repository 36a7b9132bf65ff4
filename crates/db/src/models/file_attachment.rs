use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

const ATTACHMENT_COLUMNS: &str =
    "id, account_id, name, url, size, output_id, workflow_id, event_id, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct FileAttachment {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub url: String,
    pub size: i64,
    /// Task field the file was uploaded into.
    pub output_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    /// Comment event the file was posted with.
    pub event_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFileAttachment {
    pub name: String,
    pub url: String,
    pub size: i64,
}

fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[Uuid]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

impl FileAttachment {
    pub async fn create(
        pool: &SqlitePool,
        account_id: Uuid,
        data: &CreateFileAttachment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            r#"INSERT INTO file_attachments (id, account_id, name, url, size, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {ATTACHMENT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&data.name)
        .bind(&data.url)
        .bind(data.size)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM file_attachments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Attachments of the account among `ids`, in upload order.
    pub async fn find_in_account<'e, E>(
        executor: E,
        account_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM file_attachments WHERE account_id = "
        ));
        builder.push_bind(account_id);
        builder.push(" AND id IN ");
        push_id_list(&mut builder, ids);
        builder.push(" ORDER BY created_at ASC, rowid ASC");
        builder
            .build_query_as::<FileAttachment>()
            .fetch_all(executor)
            .await
    }

    pub async fn find_by_output_id(
        pool: &SqlitePool,
        output_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM file_attachments WHERE output_id = $1 ORDER BY rowid ASC"
        ))
        .bind(output_id)
        .fetch_all(pool)
        .await
    }

    /// Links free attachments of the account to a task field.
    /// Attachments already bound to an event are left alone.
    pub async fn link_to_field<'e, E>(
        executor: E,
        account_id: Uuid,
        ids: &[Uuid],
        field_id: Uuid,
        workflow_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE file_attachments SET output_id = ");
        builder.push_bind(field_id);
        builder.push(", workflow_id = ");
        builder.push_bind(workflow_id);
        builder.push(" WHERE event_id IS NULL AND account_id = ");
        builder.push_bind(account_id);
        builder.push(" AND id IN ");
        push_id_list(&mut builder, ids);
        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Deletes the attachments of a field that are not in `keep`.
    pub async fn delete_unlisted_for_field<'e, E>(
        executor: E,
        field_id: Uuid,
        keep: &[Uuid],
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM file_attachments WHERE output_id = ");
        builder.push_bind(field_id);
        if !keep.is_empty() {
            builder.push(" AND id NOT IN ");
            push_id_list(&mut builder, keep);
        }
        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Binds free attachments of the account to a comment event.
    pub async fn bind_to_event<'e, E>(
        executor: E,
        account_id: Uuid,
        ids: &[Uuid],
        event_id: Uuid,
        workflow_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE file_attachments SET event_id = ");
        builder.push_bind(event_id);
        builder.push(", workflow_id = ");
        builder.push_bind(workflow_id);
        builder.push(" WHERE event_id IS NULL AND output_id IS NULL AND account_id = ");
        builder.push_bind(account_id);
        builder.push(" AND id IN ");
        push_id_list(&mut builder, ids);
        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
