use axum::{
    Extension, Json, Router,
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json as ResponseJson},
    routing::{delete, get, post},
};
use db::models::{notification::Notification, user::User};
use serde::{Deserialize, Serialize};
use services::services::notification::{NotificationPage, parse_filter};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{
        load_notification_middleware, require_active_subscription, require_billing_plan,
        require_user,
    },
    routes::ws_helpers::forward_json_to_ws,
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub status: Option<String>,
    /// Comma separated notification types.
    pub types: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CountNotificationsQuery {
    pub status: Option<String>,
    pub types: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct NotificationCount {
    pub count: i64,
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub notifications: Vec<Uuid>,
}

pub async fn list_notifications(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<ResponseJson<ApiResponse<NotificationPage>>, ApiError> {
    let filter = parse_filter(query.status.as_deref(), query.types.as_deref())?;
    let page = deployment
        .notifications()
        .list(user.id, &filter, query.limit, query.offset)
        .await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn count_notifications(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<CountNotificationsQuery>,
) -> Result<ResponseJson<ApiResponse<NotificationCount>>, ApiError> {
    let filter = parse_filter(query.status.as_deref(), query.types.as_deref())?;
    let count = deployment.notifications().count(user.id, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(NotificationCount { count })))
}

pub async fn delete_notification(
    Extension(user): Extension<User>,
    Extension(notification): Extension<Notification>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .notifications()
        .destroy(user.id, notification.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Marks the listed notifications read. A missing body marks nothing.
pub async fn mark_read(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    payload: Option<Json<MarkReadRequest>>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    deployment
        .notifications()
        .mark_read(user.id, &payload.notifications)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn stream_notifications_ws(
    ws: WebSocketUpgrade,
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_notifications_ws(socket, deployment, user.id).await {
            tracing::warn!("notifications WS closed: {}", e);
        }
    })
}

async fn handle_notifications_ws(
    socket: WebSocket,
    deployment: DeploymentImpl,
    user_id: Uuid,
) -> anyhow::Result<()> {
    let stream = deployment.notifications().stream(user_id);
    forward_json_to_ws(socket, stream).await
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let notification_actions = Router::new()
        .route("/", delete(delete_notification))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_notification_middleware,
        ));

    let paid = Router::new()
        .route("/read", post(mark_read))
        .nest("/{notification_id}", notification_actions)
        .layer(from_fn(require_active_subscription))
        .layer(from_fn(require_billing_plan));

    let inner = Router::new()
        .route("/", get(list_notifications))
        .route("/count", get(count_notifications))
        .route("/stream/ws", get(stream_notifications_ws))
        .merge(paid)
        .layer(from_fn_with_state(deployment.clone(), require_user));

    Router::new().nest("/notifications", inner)
}
