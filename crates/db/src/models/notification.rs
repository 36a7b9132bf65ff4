use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, author_id, task_id, event_id, notification_type, status, text, created_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    #[default]
    System,
    Comment,
    Mention,
    Urgent,
    NotUrgent,
    OverdueTask,
    DelayWorkflow,
    ResumeWorkflow,
    DueDateChanged,
    Reaction,
    CompleteTask,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    New,
    Read,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub author_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub text: Option<String>,
}

/// Narrows a user's notifications by read state and type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
    pub types: Vec<NotificationType>,
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, user_id: Uuid, filter: &NotificationFilter) {
    builder.push(" WHERE user_id = ");
    builder.push_bind(user_id);
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if !filter.types.is_empty() {
        builder.push(" AND notification_type IN (");
        let mut separated = builder.separated(", ");
        for notification_type in &filter.types {
            separated.push_bind(*notification_type);
        }
        separated.push_unseparated(")");
    }
}

impl Notification {
    pub async fn create(pool: &SqlitePool, data: &CreateNotification) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"INSERT INTO notifications (id, user_id, author_id, task_id, event_id, notification_type, status, text, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, 'new', $7, $8)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.author_id)
        .bind(data.task_id)
        .bind(data.event_id)
        .bind(data.notification_type)
        .bind(&data.text)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// The notification, if it belongs to `user_id`.
    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first.
    pub async fn find_page(
        pool: &SqlitePool,
        user_id: Uuid,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications"));
        push_filter(&mut builder, user_id, filter);
        builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
        builder
            .build_query_as::<Notification>()
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &SqlitePool,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM notifications");
        push_filter(&mut builder, user_id, filter);
        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Marks the user's unread notifications among `ids` as read.
    pub async fn mark_read(
        pool: &SqlitePool,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder =
            QueryBuilder::<Sqlite>::new("UPDATE notifications SET status = 'read' WHERE status = 'new' AND user_id = ");
        builder.push_bind(user_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_type_parses_snake_case() {
        assert_eq!(
            "overdue_task".parse::<NotificationType>().unwrap(),
            NotificationType::OverdueTask
        );
        assert_eq!(NotificationType::NotUrgent.to_string(), "not_urgent");
        assert!("bogus".parse::<NotificationType>().is_err());
    }
}
