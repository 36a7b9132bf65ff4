//! Notification store and live stream.

mod common;

use std::time::Duration;

use common::*;
use db::models::notification::{CreateNotification, NotificationStatus, NotificationType};
use futures::StreamExt;
use services::services::notification::{NotificationError, NotificationService, parse_filter};
use uuid::Uuid;

fn notification(user_id: Uuid, notification_type: NotificationType, text: &str) -> CreateNotification {
    CreateNotification {
        user_id,
        author_id: None,
        task_id: None,
        event_id: None,
        notification_type,
        text: Some(text.to_string()),
    }
}

#[tokio::test]
async fn list_pages_newest_first() {
    let pool = create_test_db().await;
    let account = create_account(&pool).await;
    let user = create_user(&pool, account.id, "ann@acme.io").await;
    let other = create_user(&pool, account.id, "bob@acme.io").await;
    let service = NotificationService::new(pool.clone(), 16);

    for i in 0..5 {
        service
            .notify(&notification(user.id, NotificationType::Comment, &format!("n{i}")))
            .await
            .unwrap();
    }
    service
        .notify(&notification(other.id, NotificationType::Comment, "not yours"))
        .await
        .unwrap();

    let filter = parse_filter(None, None).unwrap();
    let page = service.list(user.id, &filter, Some(2), Some(0)).await.unwrap();
    assert_eq!(page.total, 5);
    assert!(page.has_more);
    let texts: Vec<_> = page.notifications.iter().filter_map(|n| n.text.clone()).collect();
    assert_eq!(texts, vec!["n4", "n3"]);

    let last = service.list(user.id, &filter, Some(2), Some(4)).await.unwrap();
    assert_eq!(last.notifications.len(), 1);
    assert!(!last.has_more);

    let none = service.list(user.id, &filter, Some(0), None).await.unwrap();
    assert!(none.notifications.is_empty());
    assert!(none.has_more);
}

#[tokio::test]
async fn filters_by_status_and_type() {
    let pool = create_test_db().await;
    let account = create_account(&pool).await;
    let user = create_user(&pool, account.id, "ann@acme.io").await;
    let service = NotificationService::new(pool.clone(), 16);

    let comment = service
        .notify(&notification(user.id, NotificationType::Comment, "c"))
        .await
        .unwrap();
    service
        .notify(&notification(user.id, NotificationType::Mention, "m"))
        .await
        .unwrap();
    service
        .notify(&notification(user.id, NotificationType::OverdueTask, "o"))
        .await
        .unwrap();

    let both = parse_filter(None, Some("comment,mention")).unwrap();
    assert_eq!(service.count(user.id, &both).await.unwrap(), 2);

    assert_eq!(service.mark_read(user.id, &[comment.id]).await.unwrap(), 1);
    // Already read.
    assert_eq!(service.mark_read(user.id, &[comment.id]).await.unwrap(), 0);
    assert_eq!(service.mark_read(user.id, &[]).await.unwrap(), 0);

    let unread = parse_filter(Some("new"), None).unwrap();
    assert_eq!(service.count(user.id, &unread).await.unwrap(), 2);
    let read_comments = parse_filter(Some("read"), Some("comment")).unwrap();
    let page = service.list(user.id, &read_comments, None, None).await.unwrap();
    assert_eq!(page.notifications.len(), 1);
    assert_eq!(page.notifications[0].status, NotificationStatus::Read);
}

#[tokio::test]
async fn users_only_touch_their_own_notifications() {
    let pool = create_test_db().await;
    let account = create_account(&pool).await;
    let user = create_user(&pool, account.id, "ann@acme.io").await;
    let other = create_user(&pool, account.id, "bob@acme.io").await;
    let service = NotificationService::new(pool.clone(), 16);

    let theirs = service
        .notify(&notification(other.id, NotificationType::System, "x"))
        .await
        .unwrap();

    assert!(matches!(
        service.destroy(user.id, theirs.id).await,
        Err(NotificationError::NotFound)
    ));
    assert_eq!(service.mark_read(user.id, &[theirs.id]).await.unwrap(), 0);

    service.destroy(other.id, theirs.id).await.unwrap();
    assert!(matches!(
        service.destroy(other.id, theirs.id).await,
        Err(NotificationError::NotFound)
    ));
}

#[tokio::test]
async fn stream_delivers_only_the_users_notifications() {
    let pool = create_test_db().await;
    let account = create_account(&pool).await;
    let user = create_user(&pool, account.id, "ann@acme.io").await;
    let other = create_user(&pool, account.id, "bob@acme.io").await;
    let service = NotificationService::new(pool.clone(), 16);

    let mut stream = service.stream(user.id);
    service
        .notify(&notification(other.id, NotificationType::Comment, "skip"))
        .await
        .unwrap();
    let sent = service
        .notify(&notification(user.id, NotificationType::Urgent, "hello"))
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("stream timed out")
        .expect("stream ended")
        .unwrap();
    assert_eq!(received, sent);
}
