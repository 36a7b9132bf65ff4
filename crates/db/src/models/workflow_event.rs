use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "workflow_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowEventType {
    Comment,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct WorkflowEvent {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: WorkflowEventType,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub async fn create<'e, E>(
        executor: E,
        workflow_id: Uuid,
        user_id: Uuid,
        event_type: WorkflowEventType,
        text: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WorkflowEvent>(
            r#"INSERT INTO workflow_events (id, workflow_id, user_id, event_type, text, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, workflow_id, user_id, event_type, text, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(workflow_id)
        .bind(user_id)
        .bind(event_type)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_workflow_id(
        pool: &SqlitePool,
        workflow_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowEvent>(
            r#"SELECT id, workflow_id, user_id, event_type, text, created_at
               FROM workflow_events
               WHERE workflow_id = $1
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await
    }
}
