use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{
    file_attachment::{CreateFileAttachment, FileAttachment},
    user::User,
};
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{require_active_subscription, require_billing_plan, require_user},
};

/// Registers metadata of a file already uploaded to storage.
pub async fn create_attachment(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateFileAttachment>,
) -> Result<ResponseJson<ApiResponse<FileAttachment>>, ApiError> {
    let attachment = deployment
        .workflows()
        .create_attachment(&user, &payload)
        .await?;
    tracing::debug!("Registered attachment {} for account {}", attachment.id, user.account_id);
    Ok(ResponseJson(ApiResponse::success(attachment)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/attachments", post(create_attachment))
        .layer(from_fn(require_active_subscription))
        .layer(from_fn(require_billing_plan))
        .layer(from_fn_with_state(deployment.clone(), require_user))
}
