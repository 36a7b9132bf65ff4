//! Request guards: authentication, plan permissions and entity loading.

use axum::{
    Extension,
    extract::{Path, Query, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use db::models::{account::Account, notification::Notification, user::User};
use serde::Deserialize;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Token from `Authorization: Bearer <token>`, or the `token` query
/// parameter for clients that cannot set headers (WebSocket).
fn bearer_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
        });
    from_header
        .or_else(|| {
            Query::<TokenQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(query)| query.token)
        })
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token to a user and inserts `User` and `Account`.
pub async fn require_user(
    State(deployment): State<DeploymentImpl>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthorized)?;
    let pool = &deployment.db().pool;
    let user = User::find_by_token(pool, &token)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let account = Account::find_by_id(pool, user.account_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

/// The account must have picked a billing plan.
pub async fn require_billing_plan(
    Extension(account): Extension<Account>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !account.has_billing_plan() {
        return Err(ApiError::Forbidden(
            "Your account has no billing plan".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// The account's plan must not be past its expiration date.
pub async fn require_active_subscription(
    Extension(account): Extension<Account>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if account.is_subscription_expired(Utc::now()) {
        return Err(ApiError::Forbidden(
            "Your subscription has expired".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

pub async fn load_notification_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(notification_id): Path<Uuid>,
    Extension(user): Extension<User>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let notification = Notification::find_for_user(&deployment.db().pool, user.id, notification_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    request.extensions_mut().insert(notification);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn token_from_header_or_query() {
        assert_eq!(
            bearer_token(&request("/api/notifications", Some("Bearer abc"))).as_deref(),
            Some("abc")
        );
        assert_eq!(
            bearer_token(&request("/api/notifications", Some("bearer  abc "))).as_deref(),
            Some("abc")
        );
        assert_eq!(
            bearer_token(&request("/ws?x=1&token=xyz", None)).as_deref(),
            Some("xyz")
        );
        assert_eq!(bearer_token(&request("/", Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request("/", Some("Bearer "))), None);
        assert_eq!(bearer_token(&request("/?token=", None)), None);
        assert_eq!(
            bearer_token(&request("/ws?token=a%2Bb%3D%3D", None)).as_deref(),
            Some("a+b==")
        );
    }
}
