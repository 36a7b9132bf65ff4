use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use db::{
    DBService,
    models::{
        account::{Account, BillingPlan, CreateAccount},
        notification::{CreateNotification, Notification, NotificationType},
        template::{CreateTemplate, CreateTemplateTask, Template, TemplateTask},
        user::{CreateUser, User, UserToken},
    },
};
use serde_json::{Value, json};
use server::{deployment::AppDeployment, routes};
use services::services::config::Config;
use sqlx::SqlitePool;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    pool: SqlitePool,
}

impl TestApp {
    async fn new() -> Self {
        let db = DBService::new_in_memory()
            .await
            .expect("Failed to create in-memory database");
        let pool = db.pool.clone();
        let deployment = AppDeployment::from_db(db, Config::default());
        let router = routes::router(deployment).await;
        Self { router, pool }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn account(
        &self,
        billing_plan: Option<BillingPlan>,
        plan_expiration: Option<chrono::DateTime<Utc>>,
    ) -> Account {
        Account::create(
            &self.pool,
            &CreateAccount {
                name: "Acme".to_string(),
                billing_plan,
                plan_expiration,
            },
        )
        .await
        .unwrap()
    }

    /// Creates a user and returns it with a fresh API token.
    async fn user(&self, account: &Account, email: &str) -> (User, String) {
        let user = User::create(
            &self.pool,
            &CreateUser {
                account_id: account.id,
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                is_admin: false,
                is_account_owner: true,
            },
        )
        .await
        .unwrap();
        let token = UserToken::create(&self.pool, user.id).await.unwrap();
        (user, token.token)
    }

    async fn notification(&self, user: &User, notification_type: NotificationType) -> Notification {
        Notification::create(
            &self.pool,
            &CreateNotification {
                user_id: user.id,
                author_id: None,
                task_id: None,
                event_id: None,
                notification_type,
                text: Some("hello".to_string()),
            },
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn health_check_needs_no_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "OK");
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/api/notifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send("GET", "/api/notifications", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lists_and_counts_own_notifications() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (alice, token) = app.user(&account, "alice@example.com").await;
    let (bob, _) = app.user(&account, "bob@example.com").await;
    app.notification(&alice, NotificationType::Comment).await;
    app.notification(&alice, NotificationType::Mention).await;
    app.notification(&bob, NotificationType::Comment).await;

    let (status, body) = app
        .send("GET", "/api/notifications?limit=1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["has_more"], true);
    assert_eq!(body["data"]["notifications"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            "GET",
            "/api/notifications/count?types=mention",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn unknown_filter_value_is_bad_request() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (_, token) = app.user(&account, "alice@example.com").await;

    let (status, _) = app
        .send("GET", "/api/notifications?status=archived", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mark_read_requires_plan_and_live_subscription() {
    let app = TestApp::new().await;
    let body = Some(json!({ "notifications": [] }));

    let no_plan = app.account(None, None).await;
    let (_, token) = app.user(&no_plan, "free@example.com").await;
    let (status, _) = app
        .send("POST", "/api/notifications/read", Some(&token), body.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let expired = app
        .account(
            Some(BillingPlan::Premium),
            Some(Utc::now() - Duration::days(1)),
        )
        .await;
    let (_, token) = app.user(&expired, "expired@example.com").await;
    let (status, _) = app
        .send("POST", "/api/notifications/read", Some(&token), body.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Listing only needs authentication.
    let (status, _) = app
        .send("GET", "/api/notifications", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn mark_read_updates_only_listed_notifications() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (alice, token) = app.user(&account, "alice@example.com").await;
    let first = app.notification(&alice, NotificationType::Comment).await;
    app.notification(&alice, NotificationType::Comment).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/notifications/read",
            Some(&token),
            Some(json!({ "notifications": [first.id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = app
        .send("GET", "/api/notifications/count?status=new", Some(&token), None)
        .await;
    assert_eq!(body["data"]["count"], 1);

    // No body is a no-op, still a success.
    let (status, _) = app
        .send("POST", "/api/notifications/read", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_another_users_notification_is_not_found() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (alice, alice_token) = app.user(&account, "alice@example.com").await;
    let (bob, _) = app.user(&account, "bob@example.com").await;
    let own = app.notification(&alice, NotificationType::Comment).await;
    let foreign = app.notification(&bob, NotificationType::Comment).await;

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/api/notifications/{}", foreign.id),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/api/notifications/{}", own.id),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        Notification::find_by_id(&app.pool, own.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn dashboard_reports_validate_their_input() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (_, token) = app.user(&account, "alice@example.com").await;

    let (status, body) = app
        .send(
            "GET",
            "/api/reports/dashboard/workflows/overview?now=true",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["in_progress"], 0);
    assert!(body["data"]["started"].is_null());

    let (status, body) = app
        .send(
            "GET",
            "/api/reports/dashboard/workflows/overview?now=True",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["started"].is_null());

    let (status, _) = app
        .send(
            "GET",
            "/api/reports/dashboard/workflows/overview?date_from_tsp=2000&date_to_tsp=1000",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "GET",
            "/api/reports/dashboard/workflows/by-tasks",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "GET",
            &format!(
                "/api/reports/dashboard/workflows/by-tasks?template_id={}",
                uuid::Uuid::new_v4()
            ),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn runs_a_workflow_through_the_api() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (alice, token) = app.user(&account, "alice@example.com").await;
    let template = Template::create(
        &app.pool,
        &CreateTemplate {
            account_id: account.id,
            name: "Onboarding".to_string(),
            is_active: true,
            owner_ids: vec![alice.id],
        },
    )
    .await
    .unwrap();
    TemplateTask::create(
        &app.pool,
        &CreateTemplateTask {
            template_id: template.id,
            number: 1,
            name: "Welcome".to_string(),
            api_name: "welcome".to_string(),
            due_in_minutes: Some(60),
        },
    )
    .await
    .unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/workflows",
            Some(&token),
            Some(json!({ "template_id": template.id, "name": " New hire " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "New hire");
    assert_eq!(body["data"]["status"], "running");
    let workflow_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/workflows/{workflow_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = body["data"]["tasks"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["tasks"][0]["status"], "active");

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/workflows/{workflow_id}/tasks/{task_id}/complete"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "done");

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/workflows/{workflow_id}/terminate"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/workflows/{workflow_id}/comments"),
            Some(&token),
            Some(json!({ "text": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registers_attachments_with_valid_urls_only() {
    let app = TestApp::new().await;
    let account = app.account(Some(BillingPlan::Premium), None).await;
    let (_, token) = app.user(&account, "alice@example.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/attachments",
            Some(&token),
            Some(json!({ "name": "cv.pdf", "url": "https://files.example.com/cv.pdf", "size": 120 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "cv.pdf");

    let (status, _) = app
        .send(
            "POST",
            "/api/attachments",
            Some(&token),
            Some(json!({ "name": "cv.pdf", "url": "ftp://files.example.com/cv.pdf", "size": 120 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_server_binds_a_free_port() {
    let db = DBService::new_in_memory().await.unwrap();
    let config = Config {
        port: 0,
        ..Config::default()
    };
    let server = server::start_server(AppDeployment::from_db(db, config))
        .await
        .unwrap();
    assert_ne!(server.addr.port(), 0);
    assert!(server.url().starts_with("http://127.0.0.1:"));
    server.handle.abort();
}
