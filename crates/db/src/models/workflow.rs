use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const WORKFLOW_COLUMNS: &str = "id, account_id, template_id, name, status, current_task, \
                                due_date, date_created, date_completed";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "workflow_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Running,
    Done,
    Terminated,
    Delayed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Workflow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    /// Number of the task the workflow is currently on, starting at 1.
    pub current_task: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub date_created: DateTime<Utc>,
    pub date_completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateWorkflow {
    pub account_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
}

impl Workflow {
    pub async fn create<'e, E>(executor: E, data: &CreateWorkflow) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Workflow>(&format!(
            r#"INSERT INTO workflows (id, account_id, template_id, name, status, current_task, due_date, date_created)
               VALUES ($1, $2, $3, $4, 'running', 1, $5, $6)
               RETURNING {WORKFLOW_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(data.account_id)
        .bind(data.template_id)
        .bind(&data.name)
        .bind(data.due_date)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_in_account<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Workflow>(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1 AND account_id = $2"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_current_task<'e, E>(
        executor: E,
        id: Uuid,
        current_task: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE workflows SET current_task = $2 WHERE id = $1")
            .bind(id)
            .bind(current_task)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status: WorkflowStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE workflows SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_done<'e, E>(
        executor: E,
        id: Uuid,
        date_completed: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE workflows SET status = 'done', date_completed = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(date_completed)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
