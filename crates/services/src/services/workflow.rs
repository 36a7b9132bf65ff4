//! Workflow lifecycle: start, progress, revert, terminate and comments.

use chrono::{DateTime, Duration, Utc};
use db::models::{
    file_attachment::{CreateFileAttachment, FileAttachment},
    task::{CreateTask, Task},
    task_field::{FieldOwner, TaskField},
    template::{FieldTemplate, Template, TemplateTask},
    user::User,
    workflow::{CreateWorkflow, Workflow, WorkflowStatus},
    workflow_event::{WorkflowEvent, WorkflowEventType},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    notification::{NotificationError, NotificationService},
    task_field::{TaskFieldError, TaskFieldService},
};

#[derive(Debug, Error)]
pub enum WorkflowServiceError {
    #[error("Template not found")]
    TemplateNotFound,
    #[error("Template is not active")]
    TemplateInactive,
    #[error("Workflow not found")]
    WorkflowNotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Task field not found")]
    FieldNotFound,
    #[error("Workflow is not running")]
    NotRunning,
    #[error("Task {0} is not the current task")]
    NotCurrentTask(i64),
    #[error("Workflow is on its first task")]
    NothingToRevert,
    #[error("Comment needs text or attachments")]
    EmptyComment,
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),
    #[error(transparent)]
    Field(#[from] TaskFieldError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Field values keyed by field api name.
pub type FieldValues = Map<String, Value>;

#[derive(Debug, Clone, Deserialize, TS)]
pub struct StartWorkflow {
    pub template_id: Uuid,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub kickoff: FieldValues,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,
    pub fields: Vec<TaskField>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct WorkflowDetails {
    #[serde(flatten)]
    pub workflow: Workflow,
    pub kickoff: Vec<TaskField>,
    pub tasks: Vec<TaskDetails>,
}

fn due_from(started_at: DateTime<Utc>, template_task: Option<&TemplateTask>) -> Option<DateTime<Utc>> {
    template_task
        .and_then(|t| t.due_in_minutes)
        .map(|minutes| started_at + Duration::minutes(minutes))
}

#[derive(Debug, Clone)]
pub struct WorkflowService {
    pool: SqlitePool,
    notifications: NotificationService,
}

impl WorkflowService {
    pub fn new(pool: SqlitePool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    fn fields(&self, user: &User) -> TaskFieldService {
        TaskFieldService::new(self.pool.clone(), user.clone())
    }

    pub async fn find(&self, user: &User, id: Uuid) -> Result<Workflow, WorkflowServiceError> {
        Workflow::find_in_account(&self.pool, user.account_id, id)
            .await?
            .ok_or(WorkflowServiceError::WorkflowNotFound)
    }

    async fn find_running(&self, user: &User, id: Uuid) -> Result<Workflow, WorkflowServiceError> {
        let workflow = self.find(user, id).await?;
        if workflow.status != WorkflowStatus::Running {
            return Err(WorkflowServiceError::NotRunning);
        }
        Ok(workflow)
    }

    pub async fn details(
        &self,
        user: &User,
        id: Uuid,
    ) -> Result<WorkflowDetails, WorkflowServiceError> {
        let workflow = self.find(user, id).await?;
        let kickoff = TaskField::find_kickoff_fields(&self.pool, workflow.id).await?;
        let mut tasks = Vec::new();
        for task in Task::find_by_workflow_id(&self.pool, workflow.id).await? {
            let fields = TaskField::find_by_task_id(&self.pool, task.id).await?;
            tasks.push(TaskDetails { task, fields });
        }
        Ok(WorkflowDetails {
            workflow,
            kickoff,
            tasks,
        })
    }

    /// Runs a template in one transaction, so a rejected kickoff value leaves
    /// nothing behind. Task fields start empty and are filled when tasks
    /// complete.
    pub async fn start(
        &self,
        user: &User,
        data: &StartWorkflow,
    ) -> Result<Workflow, WorkflowServiceError> {
        let template = Template::find_owned(&self.pool, data.template_id, user.account_id, user.id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or(WorkflowServiceError::TemplateNotFound)?;
        if !template.is_active {
            return Err(WorkflowServiceError::TemplateInactive);
        }

        let fields = self.fields(user);
        let mut tx = self.pool.begin().await?;
        let workflow = Workflow::create(
            &mut *tx,
            &CreateWorkflow {
                account_id: user.account_id,
                template_id: template.id,
                name: data.name.trim().to_string(),
                due_date: data.due_date,
            },
        )
        .await?;

        for field_template in FieldTemplate::find_kickoff_fields(&mut *tx, template.id).await? {
            let raw = data.kickoff.get(&field_template.api_name).unwrap_or(&Value::Null);
            fields
                .create_instance_in(
                    &mut tx,
                    &field_template,
                    raw,
                    FieldOwner::Kickoff(workflow.id),
                    workflow.id,
                    false,
                )
                .await?;
        }

        let template_tasks = TemplateTask::find_by_template_id(&mut *tx, template.id).await?;
        let mut first_task = None;
        for template_task in &template_tasks {
            let task = Task::create(
                &mut *tx,
                &CreateTask {
                    workflow_id: workflow.id,
                    template_task_id: Some(template_task.id),
                    number: template_task.number,
                    name: template_task.name.clone(),
                    api_name: template_task.api_name.clone(),
                },
            )
            .await?;
            for field_template in
                FieldTemplate::find_by_task_template_id(&mut *tx, template_task.id).await?
            {
                fields
                    .create_instance_in(
                        &mut tx,
                        &field_template,
                        &Value::Null,
                        FieldOwner::Task(task.id),
                        workflow.id,
                        true,
                    )
                    .await?;
            }
            if first_task.is_none() {
                first_task = Some((task, template_task));
            }
        }

        let now = Utc::now();
        match first_task {
            Some((task, template_task)) => {
                Workflow::set_current_task(&mut *tx, workflow.id, task.number).await?;
                Task::activate(&mut *tx, task.id, now, due_from(now, Some(template_task))).await?;
            }
            None => {
                Workflow::mark_done(&mut *tx, workflow.id, now).await?;
            }
        }
        tx.commit().await?;

        tracing::info!(
            "User {} started workflow {} from template {}",
            user.id,
            workflow.id,
            template.id
        );
        self.find(user, workflow.id).await
    }

    /// Stores the task outputs, completes the current task and moves on.
    pub async fn complete_task(
        &self,
        user: &User,
        workflow_id: Uuid,
        task_id: Uuid,
        values: &FieldValues,
    ) -> Result<Workflow, WorkflowServiceError> {
        let workflow = self.find_running(user, workflow_id).await?;
        let task = Task::find_by_id(&self.pool, task_id)
            .await?
            .filter(|t| t.workflow_id == workflow.id)
            .ok_or(WorkflowServiceError::TaskNotFound)?;
        if task.number != workflow.current_task {
            return Err(WorkflowServiceError::NotCurrentTask(task.number));
        }

        let task_fields = TaskField::find_by_task_id(&self.pool, task.id).await?;
        for field in &task_fields {
            if field.is_required && field.value.is_empty() && !values.contains_key(&field.api_name)
            {
                return Err(TaskFieldError::Required {
                    api_name: field.api_name.clone(),
                }
                .into());
            }
        }
        let fields = self.fields(user);
        let mut tx = self.pool.begin().await?;
        for field in &task_fields {
            if let Some(raw) = values.get(&field.api_name) {
                fields.partial_update_in(&mut tx, field, raw).await?;
            }
        }

        let now = Utc::now();
        Task::complete(&mut *tx, task.id, now).await?;
        match Task::find_by_number(&mut *tx, workflow.id, task.number + 1).await? {
            Some(next) => {
                let template_task = match next.template_task_id {
                    Some(id) => TemplateTask::find_by_id(&mut *tx, id).await?,
                    None => None,
                };
                Workflow::set_current_task(&mut *tx, workflow.id, next.number).await?;
                Task::activate(&mut *tx, next.id, now, due_from(now, template_task.as_ref()))
                    .await?;
                tx.commit().await?;
                tracing::debug!("Workflow {} moved to task {}", workflow.id, next.number);
            }
            None => {
                Workflow::mark_done(&mut *tx, workflow.id, now).await?;
                tx.commit().await?;
                tracing::info!("Workflow {} completed", workflow.id);
            }
        }
        self.find(user, workflow.id).await
    }

    /// Returns a running workflow to its previous task. The previous task
    /// keeps its due date; the current one goes back to pending.
    pub async fn revert(
        &self,
        user: &User,
        workflow_id: Uuid,
    ) -> Result<Workflow, WorkflowServiceError> {
        let workflow = self.find_running(user, workflow_id).await?;
        if workflow.current_task <= 1 {
            return Err(WorkflowServiceError::NothingToRevert);
        }
        let mut tx = self.pool.begin().await?;
        let previous = Task::find_by_number(&mut *tx, workflow.id, workflow.current_task - 1)
            .await?
            .ok_or(WorkflowServiceError::TaskNotFound)?;
        if let Some(current) =
            Task::find_by_number(&mut *tx, workflow.id, workflow.current_task).await?
        {
            Task::reset(&mut *tx, current.id).await?;
        }
        Task::reopen(&mut *tx, previous.id, Utc::now()).await?;
        Workflow::set_current_task(&mut *tx, workflow.id, previous.number).await?;
        tx.commit().await?;
        tracing::debug!("Workflow {} returned to task {}", workflow.id, previous.number);
        self.find(user, workflow.id).await
    }

    pub async fn terminate(
        &self,
        user: &User,
        workflow_id: Uuid,
    ) -> Result<Workflow, WorkflowServiceError> {
        let workflow = self.find(user, workflow_id).await?;
        if matches!(
            workflow.status,
            WorkflowStatus::Done | WorkflowStatus::Terminated
        ) {
            return Err(WorkflowServiceError::NotRunning);
        }
        Workflow::set_status(&self.pool, workflow.id, WorkflowStatus::Terminated).await?;
        tracing::info!("User {} terminated workflow {}", user.id, workflow.id);
        self.find(user, workflow.id).await
    }

    /// Posts a comment, binds the given attachments to it and notifies the
    /// template owners.
    pub async fn comment(
        &self,
        user: &User,
        workflow_id: Uuid,
        text: Option<&str>,
        attachment_ids: &[Uuid],
    ) -> Result<WorkflowEvent, WorkflowServiceError> {
        let workflow = self.find(user, workflow_id).await?;
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        if text.is_none() && attachment_ids.is_empty() {
            return Err(WorkflowServiceError::EmptyComment);
        }
        let mut tx = self.pool.begin().await?;
        let event = WorkflowEvent::create(
            &mut *tx,
            workflow.id,
            user.id,
            WorkflowEventType::Comment,
            text,
        )
        .await?;
        let bound = FileAttachment::bind_to_event(
            &mut *tx,
            user.account_id,
            attachment_ids,
            event.id,
            workflow.id,
        )
        .await?;
        tx.commit().await?;
        if bound < attachment_ids.len() as u64 {
            tracing::warn!(
                "Bound {} of {} attachments to comment {}",
                bound,
                attachment_ids.len(),
                event.id
            );
        }
        self.notifications
            .notify_comment(workflow.template_id, user.id, &event)
            .await?;
        Ok(event)
    }

    pub async fn update_field(
        &self,
        user: &User,
        field_id: Uuid,
        raw: &Value,
    ) -> Result<TaskField, WorkflowServiceError> {
        let field = TaskField::find_by_id(&self.pool, field_id)
            .await?
            .ok_or(WorkflowServiceError::FieldNotFound)?;
        let workflow = Workflow::find_in_account(&self.pool, user.account_id, field.workflow_id)
            .await?
            .ok_or(WorkflowServiceError::FieldNotFound)?;
        if workflow.status != WorkflowStatus::Running {
            return Err(WorkflowServiceError::NotRunning);
        }
        Ok(self.fields(user).partial_update(&field, raw).await?)
    }

    /// Registers an uploaded file for the user's account.
    pub async fn create_attachment(
        &self,
        user: &User,
        data: &CreateFileAttachment,
    ) -> Result<FileAttachment, WorkflowServiceError> {
        if data.name.trim().is_empty() {
            return Err(WorkflowServiceError::InvalidAttachment(
                "name is empty".to_string(),
            ));
        }
        if data.size < 0 {
            return Err(WorkflowServiceError::InvalidAttachment(
                "size is negative".to_string(),
            ));
        }
        let valid_url = url::Url::parse(&data.url)
            .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some());
        if !valid_url {
            return Err(WorkflowServiceError::InvalidAttachment(format!(
                "invalid url '{}'",
                data.url
            )));
        }
        Ok(FileAttachment::create(&self.pool, user.account_id, data).await?)
    }
}
