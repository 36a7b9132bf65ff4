use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::DeploymentImpl;

pub mod attachments;
pub mod health;
pub mod notifications;
pub mod reports;
pub mod workflows;
pub mod ws_helpers;

/// Origins come from the config; an empty list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub async fn router(deployment: DeploymentImpl) -> Router {
    let cors = cors_layer(&deployment.config().read().await.cors_origins);

    let api = Router::new()
        .merge(health::router())
        .merge(notifications::router(&deployment))
        .merge(reports::router(&deployment))
        .merge(workflows::router(&deployment))
        .merge(attachments::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
