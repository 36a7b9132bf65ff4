use db::models::{
    notification::{
        CreateNotification, Notification, NotificationFilter, NotificationStatus, NotificationType,
    },
    template::Template,
    workflow_event::WorkflowEvent,
};
use futures::{StreamExt, stream::BoxStream};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,
    #[error("Invalid notification filter: {0}")]
    InvalidFilter(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub has_more: bool,
}

/// Builds a filter from the `status` and comma separated `types` query values.
pub fn parse_filter(
    status: Option<&str>,
    types: Option<&str>,
) -> Result<NotificationFilter, NotificationError> {
    let status = status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<NotificationStatus>()
                .map_err(|_| NotificationError::InvalidFilter(format!("unknown status '{s}'")))
        })
        .transpose()?;
    let types = types
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<NotificationType>()
                .map_err(|_| NotificationError::InvalidFilter(format!("unknown type '{t}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NotificationFilter { status, types })
}

/// Clamps paging input: limit defaults to 20 and stays within 0..=100,
/// offset is never negative.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

/// Per-user notification store with live delivery to connected clients.
#[derive(Debug, Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    sender: broadcast::Sender<Notification>,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { pool, sender }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<NotificationPage, NotificationError> {
        let (limit, offset) = page_bounds(limit, offset);
        let total = Notification::count(&self.pool, user_id, filter).await?;
        let notifications =
            Notification::find_page(&self.pool, user_id, filter, limit, offset).await?;
        let has_more = offset + (notifications.len() as i64) < total;
        Ok(NotificationPage {
            notifications,
            total,
            has_more,
        })
    }

    pub async fn count(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) -> Result<i64, NotificationError> {
        Ok(Notification::count(&self.pool, user_id, filter).await?)
    }

    /// Notifications of other users are reported as missing.
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Notification, NotificationError> {
        Notification::find_for_user(&self.pool, user_id, id)
            .await?
            .ok_or(NotificationError::NotFound)
    }

    pub async fn destroy(&self, user_id: Uuid, id: Uuid) -> Result<(), NotificationError> {
        let notification = self.find_for_user(user_id, id).await?;
        if Notification::delete(&self.pool, notification.id).await? == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }

    pub async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> Result<u64, NotificationError> {
        let updated = Notification::mark_read(&self.pool, user_id, ids).await?;
        tracing::debug!("Marked {} notifications read for user {}", updated, user_id);
        Ok(updated)
    }

    /// Stores the notification and pushes it to live streams.
    pub async fn notify(&self, data: &CreateNotification) -> Result<Notification, NotificationError> {
        let notification = Notification::create(&self.pool, data).await?;
        // No receivers just means nobody is connected.
        let _ = self.sender.send(notification.clone());
        Ok(notification)
    }

    /// Tells every owner of the template, except the author, about a comment.
    pub async fn notify_comment(
        &self,
        template_id: Uuid,
        author_id: Uuid,
        event: &WorkflowEvent,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut sent = Vec::new();
        for owner_id in Template::owner_ids(&self.pool, template_id).await? {
            if owner_id == author_id {
                continue;
            }
            sent.push(
                self.notify(&CreateNotification {
                    user_id: owner_id,
                    author_id: Some(author_id),
                    task_id: None,
                    event_id: Some(event.id),
                    notification_type: NotificationType::Comment,
                    text: event.text.clone(),
                })
                .await?,
            );
        }
        Ok(sent)
    }

    /// Notifications created for `user_id` from now on.
    pub fn stream(&self, user_id: Uuid) -> BoxStream<'static, Result<Notification, std::io::Error>> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(move |msg_result| async move {
                match msg_result {
                    Ok(notification) if notification.user_id == user_id => Some(Ok(notification)),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            skipped = skipped,
                            user_id = %user_id,
                            "notification stream lagged"
                        );
                        None
                    }
                }
            })
            .boxed()
    }
}
