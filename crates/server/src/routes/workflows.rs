use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::{from_fn, from_fn_with_state},
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::{
    task_field::TaskField, user::User, workflow::Workflow, workflow_event::WorkflowEvent,
};
use serde::Deserialize;
use serde_json::Value;
use services::services::workflow::{FieldValues, StartWorkflow, WorkflowDetails};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{require_active_subscription, require_billing_plan, require_user},
};

#[derive(Debug, Default, Deserialize, TS)]
pub struct CompleteTaskRequest {
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub values: FieldValues,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateCommentRequest {
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateFieldRequest {
    #[serde(default)]
    #[ts(type = "unknown")]
    pub value: Value,
}

pub async fn start_workflow(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<StartWorkflow>,
) -> Result<ResponseJson<ApiResponse<Workflow>>, ApiError> {
    let workflow = deployment.workflows().start(&user, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(workflow)))
}

pub async fn get_workflow(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Path(workflow_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkflowDetails>>, ApiError> {
    let details = deployment.workflows().details(&user, workflow_id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn complete_task(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Path((workflow_id, task_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<CompleteTaskRequest>>,
) -> Result<ResponseJson<ApiResponse<Workflow>>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let workflow = deployment
        .workflows()
        .complete_task(&user, workflow_id, task_id, &payload.values)
        .await?;
    Ok(ResponseJson(ApiResponse::success(workflow)))
}

pub async fn revert_workflow(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Path(workflow_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Workflow>>, ApiError> {
    let workflow = deployment.workflows().revert(&user, workflow_id).await?;
    Ok(ResponseJson(ApiResponse::success(workflow)))
}

pub async fn terminate_workflow(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Path(workflow_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Workflow>>, ApiError> {
    let workflow = deployment.workflows().terminate(&user, workflow_id).await?;
    Ok(ResponseJson(ApiResponse::success(workflow)))
}

pub async fn create_comment(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Path(workflow_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<ResponseJson<ApiResponse<WorkflowEvent>>, ApiError> {
    let event = deployment
        .workflows()
        .comment(
            &user,
            workflow_id,
            payload.text.as_deref(),
            &payload.attachments,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn update_field(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Path(field_id): Path<Uuid>,
    Json(payload): Json<UpdateFieldRequest>,
) -> Result<ResponseJson<ApiResponse<TaskField>>, ApiError> {
    let field = deployment
        .workflows()
        .update_field(&user, field_id, &payload.value)
        .await?;
    Ok(ResponseJson(ApiResponse::success(field)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let workflow_id_router = Router::new()
        .route("/", get(get_workflow))
        .route("/tasks/{task_id}/complete", post(complete_task))
        .route("/revert", post(revert_workflow))
        .route("/terminate", post(terminate_workflow))
        .route("/comments", post(create_comment));

    let workflows = Router::new()
        .route("/", post(start_workflow))
        .nest("/{workflow_id}", workflow_id_router);

    Router::new()
        .nest("/workflows", workflows)
        .route("/fields/{field_id}", patch(update_field))
        .layer(from_fn(require_active_subscription))
        .layer(from_fn(require_billing_plan))
        .layer(from_fn_with_state(deployment.clone(), require_user))
}
