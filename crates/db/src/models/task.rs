use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, workflow_id, template_task_id, number, name, api_name, status, \
                            due_date, date_first_started, date_started, date_completed";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub template_task_id: Option<Uuid>,
    pub number: i64,
    pub name: String,
    pub api_name: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub date_first_started: Option<DateTime<Utc>>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTask {
    pub workflow_id: Uuid,
    pub template_task_id: Option<Uuid>,
    pub number: i64,
    pub name: String,
    pub api_name: String,
}

impl Task {
    pub async fn create<'e, E>(executor: E, data: &CreateTask) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"INSERT INTO tasks (id, workflow_id, template_task_id, number, name, api_name, status)
               VALUES ($1, $2, $3, $4, $5, $6, 'pending')
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(data.workflow_id)
        .bind(data.template_task_id)
        .bind(data.number)
        .bind(&data.name)
        .bind(&data.api_name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_workflow_id<'e, E>(
        executor: E,
        workflow_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE workflow_id = $1 ORDER BY number ASC"
        ))
        .bind(workflow_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_number<'e, E>(
        executor: E,
        workflow_id: Uuid,
        number: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE workflow_id = $1 AND number = $2"
        ))
        .bind(workflow_id)
        .bind(number)
        .fetch_optional(executor)
        .await
    }

    /// Makes the task current with a fresh due date. The first start date is
    /// kept across returns.
    pub async fn activate<'e, E>(
        executor: E,
        id: Uuid,
        started_at: DateTime<Utc>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"UPDATE tasks
               SET status = 'active',
                   date_started = $2,
                   date_first_started = COALESCE(date_first_started, $2),
                   date_completed = NULL,
                   due_date = $3
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(id)
        .bind(started_at)
        .bind(due_date)
        .fetch_optional(executor)
        .await
    }

    pub async fn complete<'e, E>(
        executor: E,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"UPDATE tasks SET status = 'completed', date_completed = $2
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(id)
        .bind(completed_at)
        .fetch_optional(executor)
        .await
    }

    /// Makes a completed task current again, keeping its due date.
    pub async fn reopen<'e, E>(
        executor: E,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"UPDATE tasks
               SET status = 'active',
                   date_started = $2,
                   date_first_started = COALESCE(date_first_started, $2),
                   date_completed = NULL
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(id)
        .bind(started_at)
        .fetch_optional(executor)
        .await
    }

    /// Puts a task back in the queue after the workflow returned past it.
    pub async fn reset<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE tasks
               SET status = 'pending', date_started = NULL, date_completed = NULL, due_date = NULL
               WHERE id = $1"#,
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
