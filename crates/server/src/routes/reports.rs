use axum::{
    Extension, Router,
    extract::{Query, State},
    middleware::{from_fn, from_fn_with_state},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    dashboard::{TaskBreakdown, TemplateBreakdown, WorkflowCounts},
    user::User,
};
use serde::Deserialize;
use services::services::dashboard::{DashboardParams, deserialize_flag};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{require_active_subscription, require_user},
};

#[derive(Debug, Deserialize)]
pub struct ByTasksQuery {
    pub template_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub now: bool,
    pub date_from_tsp: Option<f64>,
    pub date_to_tsp: Option<f64>,
}

impl ByTasksQuery {
    fn params(&self) -> DashboardParams {
        DashboardParams {
            now: self.now,
            date_from_tsp: self.date_from_tsp,
            date_to_tsp: self.date_to_tsp,
        }
    }
}

pub async fn workflows_overview(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(params): Query<DashboardParams>,
) -> Result<ResponseJson<ApiResponse<WorkflowCounts>>, ApiError> {
    let counts = deployment.dashboard().overview(&user, &params).await?;
    Ok(ResponseJson(ApiResponse::success(counts)))
}

pub async fn workflows_breakdown(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(params): Query<DashboardParams>,
) -> Result<ResponseJson<ApiResponse<Vec<TemplateBreakdown>>>, ApiError> {
    let rows = deployment.dashboard().breakdown(&user, &params).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn workflows_by_tasks(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ByTasksQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskBreakdown>>>, ApiError> {
    let template_id = query
        .template_id
        .ok_or_else(|| ApiError::BadRequest("template_id is required".to_string()))?;
    let rows = deployment
        .dashboard()
        .by_tasks(&user, template_id, &query.params())
        .await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let inner = Router::new()
        .route("/overview", get(workflows_overview))
        .route("/breakdown", get(workflows_breakdown))
        .route("/by-tasks", get(workflows_by_tasks))
        .layer(from_fn(require_active_subscription))
        .layer(from_fn_with_state(deployment.clone(), require_user));

    Router::new().nest("/reports/dashboard/workflows", inner)
}
