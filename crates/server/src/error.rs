use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use services::services::{
    dashboard::DashboardError, notification::NotificationError, task_field::TaskFieldError,
    workflow::WorkflowServiceError,
};
use thiserror::Error;
use ts_rs::TS;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    TaskField(#[from] TaskFieldError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error(transparent)]
    Workflow(#[from] WorkflowServiceError),
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
}

/// Extra body of a failed field validation.
#[derive(Debug, Serialize, TS)]
pub struct FieldErrorData {
    pub api_name: String,
}

fn task_field_status(err: &TaskFieldError) -> StatusCode {
    match err {
        _ if err.is_validation() => StatusCode::BAD_REQUEST,
        TaskFieldError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::TaskField(err) => task_field_status(err),
            ApiError::Notification(err) => match err {
                NotificationError::NotFound => StatusCode::NOT_FOUND,
                NotificationError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Dashboard(err) => match err {
                DashboardError::TemplateNotFound => StatusCode::NOT_FOUND,
                DashboardError::InvalidTimestamp(_) | DashboardError::InvalidPeriod => {
                    StatusCode::BAD_REQUEST
                }
                DashboardError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Workflow(err) => match err {
                WorkflowServiceError::TemplateNotFound
                | WorkflowServiceError::WorkflowNotFound
                | WorkflowServiceError::TaskNotFound
                | WorkflowServiceError::FieldNotFound => StatusCode::NOT_FOUND,
                WorkflowServiceError::TemplateInactive
                | WorkflowServiceError::NotRunning
                | WorkflowServiceError::NotCurrentTask(_)
                | WorkflowServiceError::NothingToRevert => StatusCode::CONFLICT,
                WorkflowServiceError::EmptyComment | WorkflowServiceError::InvalidAttachment(_) => {
                    StatusCode::BAD_REQUEST
                }
                WorkflowServiceError::Field(err) => task_field_status(err),
                WorkflowServiceError::Notification(_) | WorkflowServiceError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn field_error(&self) -> Option<&TaskFieldError> {
        match self {
            ApiError::TaskField(err) | ApiError::Workflow(WorkflowServiceError::Field(err)) => {
                Some(err)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("API error: {}", self);
            let body = ApiResponse::<()>::error("Internal server error");
            return (status, Json(body)).into_response();
        }

        let message = self.to_string();
        match self.field_error().and_then(TaskFieldError::api_name) {
            Some(api_name) => {
                let body = ApiResponse::<(), FieldErrorData>::error_with_message_and_data(
                    &message,
                    FieldErrorData {
                        api_name: api_name.to_string(),
                    },
                );
                (status, Json(body)).into_response()
            }
            None => (status, Json(ApiResponse::<()>::error(&message))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(NotificationError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WorkflowServiceError::Field(TaskFieldError::Required {
                api_name: "x".to_string()
            }))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WorkflowServiceError::NothingToRevert).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
