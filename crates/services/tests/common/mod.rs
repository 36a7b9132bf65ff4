//! Shared fixtures for the service integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use db::{
    DBService,
    models::{
        account::{Account, BillingPlan, CreateAccount},
        template::{
            CreateFieldTemplate, CreateTemplate, CreateTemplateTask, FieldTemplate,
            FieldTemplateSelection, Template, TemplateTask,
        },
        task_field::FieldType,
        user::{CreateUser, User},
    },
};
use sqlx::SqlitePool;
use uuid::Uuid;

/// In-memory database with all migrations applied.
pub async fn create_test_db() -> SqlitePool {
    DBService::new_in_memory()
        .await
        .expect("Failed to create in-memory database")
        .pool
}

pub async fn create_account(pool: &SqlitePool) -> Account {
    Account::create(
        pool,
        &CreateAccount {
            name: "Acme".to_string(),
            billing_plan: Some(BillingPlan::Premium),
            plan_expiration: None,
        },
    )
    .await
    .expect("Failed to create account")
}

pub async fn create_user(pool: &SqlitePool, account_id: Uuid, email: &str) -> User {
    User::create(
        pool,
        &CreateUser {
            account_id,
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: email.split('@').next().unwrap_or_default().to_string(),
            is_admin: false,
            is_account_owner: false,
        },
    )
    .await
    .expect("Failed to create user")
}

pub async fn create_template(pool: &SqlitePool, account_id: Uuid, owners: &[Uuid], name: &str) -> Template {
    Template::create(
        pool,
        &CreateTemplate {
            account_id,
            name: name.to_string(),
            is_active: true,
            owner_ids: owners.to_vec(),
        },
    )
    .await
    .expect("Failed to create template")
}

pub async fn create_template_task(
    pool: &SqlitePool,
    template_id: Uuid,
    number: i64,
    due_in_minutes: Option<i64>,
) -> TemplateTask {
    TemplateTask::create(
        pool,
        &CreateTemplateTask {
            template_id,
            number,
            name: format!("Step {number}"),
            api_name: format!("step-{number}"),
            due_in_minutes,
        },
    )
    .await
    .expect("Failed to create template task")
}

pub async fn create_field_template(
    pool: &SqlitePool,
    template_id: Uuid,
    task_template_id: Option<Uuid>,
    field_type: FieldType,
    api_name: &str,
    is_required: bool,
) -> FieldTemplate {
    FieldTemplate::create(
        pool,
        &CreateFieldTemplate {
            template_id,
            task_template_id,
            field_type,
            name: api_name.replace('-', " "),
            description: String::new(),
            api_name: api_name.to_string(),
            order: 0,
            is_required,
        },
    )
    .await
    .expect("Failed to create field template")
}

pub async fn create_selections(
    pool: &SqlitePool,
    field_template_id: Uuid,
    api_names: &[&str],
) -> Vec<FieldTemplateSelection> {
    let mut selections = Vec::new();
    for api_name in api_names {
        selections.push(
            FieldTemplateSelection::create(pool, field_template_id, &api_name.to_uppercase(), api_name)
                .await
                .expect("Failed to create selection"),
        );
    }
    selections
}

/// Inserts a workflow with explicit dates, bypassing the lifecycle service.
#[allow(clippy::too_many_arguments)]
pub async fn insert_workflow(
    pool: &SqlitePool,
    account_id: Uuid,
    template_id: Uuid,
    status: &str,
    current_task: i64,
    date_created: DateTime<Utc>,
    date_completed: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO workflows (id, account_id, template_id, name, status, current_task, due_date, date_created, date_completed)
         VALUES (?, ?, ?, 'wf', ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(account_id)
    .bind(template_id)
    .bind(status)
    .bind(current_task)
    .bind(due_date)
    .bind(date_created)
    .bind(date_completed)
    .execute(pool)
    .await
    .expect("Failed to insert workflow");
    id
}

/// Inserts a task with explicit dates. A task with a start date is active
/// unless it is completed.
pub async fn insert_task(
    pool: &SqlitePool,
    workflow_id: Uuid,
    number: i64,
    date_started: Option<DateTime<Utc>>,
    date_completed: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
) -> Uuid {
    let id = Uuid::new_v4();
    let status = match (date_started, date_completed) {
        (_, Some(_)) => "completed",
        (Some(_), None) => "active",
        (None, None) => "pending",
    };
    sqlx::query(
        "INSERT INTO tasks (id, workflow_id, number, name, api_name, status, due_date, date_first_started, date_started, date_completed)
         VALUES (?, ?, ?, 'task', 'task', ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(workflow_id)
    .bind(number)
    .bind(status)
    .bind(due_date)
    .bind(date_started)
    .bind(date_started)
    .bind(date_completed)
    .execute(pool)
    .await
    .expect("Failed to insert task");
    id
}
