//! Validation and storage of task field values.

pub mod error;
pub mod selection;
pub mod value;

use db::models::{
    field_selection::FieldSelection,
    file_attachment::FileAttachment,
    task_field::{CreateTaskField, FieldOwner, FieldType, FieldValue, TaskField},
    template::{FieldTemplate, FieldTemplateSelection},
    user::User,
};
pub use error::TaskFieldError;
pub use selection::Selection;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;
pub use value::FieldRules;
use value::Rendered;

use super::markdown;

/// Works on task fields on behalf of one user. Users, selections and
/// attachments are only resolved inside that user's account.
///
/// The `*_in` methods run on a caller's connection so several field writes
/// can share one transaction.
#[derive(Debug, Clone)]
pub struct TaskFieldService {
    pool: SqlitePool,
    user: User,
}

impl TaskFieldService {
    pub fn new(pool: SqlitePool, user: User) -> Self {
        Self { pool, user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Creates a field from its template. With `skip_value` the field starts
    /// empty and `raw` is ignored.
    pub async fn create_instance(
        &self,
        template: &FieldTemplate,
        raw: &Value,
        owner: FieldOwner,
        workflow_id: Uuid,
        skip_value: bool,
    ) -> Result<TaskField, TaskFieldError> {
        let mut tx = self.pool.begin().await?;
        let field = self
            .create_instance_in(&mut tx, template, raw, owner, workflow_id, skip_value)
            .await?;
        tx.commit().await?;
        Ok(field)
    }

    pub async fn create_instance_in(
        &self,
        conn: &mut SqliteConnection,
        template: &FieldTemplate,
        raw: &Value,
        owner: FieldOwner,
        workflow_id: Uuid,
        skip_value: bool,
    ) -> Result<TaskField, TaskFieldError> {
        let template_selections = if template.field_type.has_selections() {
            FieldTemplateSelection::find_by_field_template_id(&mut *conn, template.id).await?
        } else {
            Vec::new()
        };

        let field_value = if skip_value {
            FieldValue::default()
        } else {
            self.get_valid_value_in(conn, FieldRules::from(template), raw, &template_selections)
                .await?
        };

        let field = TaskField::create(
            &mut *conn,
            &CreateTaskField {
                workflow_id,
                owner,
                field_template_id: Some(template.id),
                field_type: template.field_type,
                name: template.name.clone(),
                description: template.description.clone(),
                api_name: template.api_name.clone(),
                order: template.order,
                is_required: template.is_required,
                value: field_value,
            },
        )
        .await?;

        let raw = if skip_value { &Value::Null } else { raw };
        if field.field_type.has_selections() {
            self.create_selections_with_value(conn, &field, &template_selections, raw)
                .await?;
        } else if field.field_type == FieldType::File {
            let ids = value::attachment_ids(FieldRules::from(&field), raw)?;
            self.link_new_attachments(conn, &field, &ids).await?;
        }

        tracing::debug!(
            "Created {} field '{}' for workflow {}",
            field.field_type,
            field.api_name,
            workflow_id
        );
        Ok(field)
    }

    /// Copies the template selections onto the field, selecting the ones
    /// `raw` names.
    pub async fn create_selections_with_value(
        &self,
        conn: &mut SqliteConnection,
        field: &TaskField,
        template_selections: &[FieldTemplateSelection],
        raw: &Value,
    ) -> Result<Vec<FieldSelection>, TaskFieldError> {
        let mut created = Vec::with_capacity(template_selections.len());
        for template_selection in template_selections {
            created.push(
                FieldSelection::create(
                    &mut *conn,
                    field.id,
                    &template_selection.value,
                    &template_selection.api_name,
                    selection::is_selected_by(raw, template_selection),
                )
                .await?,
            );
        }
        Ok(created)
    }

    /// Links attachments of the user's account that are not posted with a
    /// comment to the field.
    pub async fn link_new_attachments(
        &self,
        conn: &mut SqliteConnection,
        field: &TaskField,
        ids: &[Uuid],
    ) -> Result<u64, TaskFieldError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let linked = FileAttachment::link_to_field(
            &mut *conn,
            self.user.account_id,
            ids,
            field.id,
            field.workflow_id,
        )
        .await?;
        if linked < ids.len() as u64 {
            tracing::warn!(
                "Linked {} of {} attachments to field {}",
                linked,
                ids.len(),
                field.id
            );
        }
        Ok(linked)
    }

    pub async fn update_selections(
        &self,
        conn: &mut SqliteConnection,
        field: &TaskField,
        raw: &Value,
    ) -> Result<Vec<FieldSelection>, TaskFieldError> {
        let mut selections = FieldSelection::find_by_field_id(&mut *conn, field.id).await?;
        for selection in &mut selections {
            let is_selected = selection::is_selected_by(raw, &*selection);
            if selection.is_selected != is_selected {
                FieldSelection::set_selected(&mut *conn, selection.id, is_selected).await?;
                selection.is_selected = is_selected;
            }
        }
        Ok(selections)
    }

    /// Validates `raw` and stores it on the field along with its selections
    /// or attachments.
    pub async fn partial_update(
        &self,
        field: &TaskField,
        raw: &Value,
    ) -> Result<TaskField, TaskFieldError> {
        let mut tx = self.pool.begin().await?;
        let updated = self.partial_update_in(&mut tx, field, raw).await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn partial_update_in(
        &self,
        conn: &mut SqliteConnection,
        field: &TaskField,
        raw: &Value,
    ) -> Result<TaskField, TaskFieldError> {
        let selections = if field.field_type.has_selections() {
            FieldSelection::find_by_field_id(&mut *conn, field.id).await?
        } else {
            Vec::new()
        };
        let field_value = self
            .get_valid_value_in(conn, FieldRules::from(field), raw, &selections)
            .await?;

        if field.field_type == FieldType::File {
            let ids = value::attachment_ids(FieldRules::from(field), raw)?;
            let removed =
                FileAttachment::delete_unlisted_for_field(&mut *conn, field.id, &ids).await?;
            if removed > 0 {
                tracing::debug!("Removed {} attachments from field {}", removed, field.id);
            }
            self.link_new_attachments(conn, field, &ids).await?;
        } else if field.field_type.has_selections() {
            self.update_selections(conn, field, raw).await?;
        }

        TaskField::update_value(&mut *conn, field.id, &field_value)
            .await?
            .ok_or(TaskFieldError::NotFound)
    }

    /// Checks `raw` against the field type and renders its stored forms.
    pub async fn get_valid_value<S: Selection>(
        &self,
        rules: FieldRules<'_>,
        raw: &Value,
        selections: &[S],
    ) -> Result<FieldValue, TaskFieldError> {
        let mut conn = self.pool.acquire().await?;
        self.get_valid_value_in(&mut conn, rules, raw, selections).await
    }

    pub async fn get_valid_value_in<S: Selection>(
        &self,
        conn: &mut SqliteConnection,
        rules: FieldRules<'_>,
        raw: &Value,
        selections: &[S],
    ) -> Result<FieldValue, TaskFieldError> {
        if value::is_empty(raw) {
            if rules.is_required {
                return Err(TaskFieldError::Required {
                    api_name: rules.api_name(),
                });
            }
            return Ok(FieldValue {
                value: String::new(),
                markdown_value: Some(String::new()),
                clear_value: Some(String::new()),
                user_id: None,
            });
        }

        let mut user_id = None;
        let rendered = match rules.field_type {
            FieldType::String | FieldType::Text => value::string(rules, raw)?,
            FieldType::Radio | FieldType::Dropdown => {
                value::single_selection(rules, raw, selections)?
            }
            FieldType::Checkbox => value::multi_selection(rules, raw, selections)?,
            FieldType::Date => value::date(rules, raw)?,
            FieldType::Url => value::url(rules, raw)?,
            FieldType::User => {
                let user = self.resolve_user(conn, rules, raw).await?;
                user_id = Some(user.id);
                Rendered::same(user.display_name())
            }
            FieldType::File => self.render_attachments(conn, rules, raw).await?,
        };

        Ok(FieldValue {
            clear_value: Some(markdown::clear(&rendered.value)),
            value: rendered.value,
            markdown_value: Some(rendered.markdown),
            user_id,
        })
    }

    async fn resolve_user(
        &self,
        conn: &mut SqliteConnection,
        rules: FieldRules<'_>,
        raw: &Value,
    ) -> Result<User, TaskFieldError> {
        let invalid = || TaskFieldError::InvalidUser {
            api_name: rules.api_name(),
        };
        let reference = raw.as_str().map(str::trim).ok_or_else(invalid)?;
        let account_id = self.user.account_id;
        let user = match Uuid::parse_str(reference) {
            Ok(id) => User::find_in_account(&mut *conn, account_id, id).await?,
            Err(_) if reference.contains('@') => {
                User::find_by_email_in_account(&mut *conn, account_id, reference).await?
            }
            Err(_) => None,
        };
        user.ok_or_else(invalid)
    }

    async fn render_attachments(
        &self,
        conn: &mut SqliteConnection,
        rules: FieldRules<'_>,
        raw: &Value,
    ) -> Result<Rendered, TaskFieldError> {
        let ids = value::attachment_ids(rules, raw)?;
        let found = FileAttachment::find_in_account(&mut *conn, self.user.account_id, &ids).await?;
        let mut ordered = Vec::with_capacity(ids.len());
        for id in &ids {
            let attachment = found
                .iter()
                .find(|a| a.id == *id)
                .ok_or_else(|| TaskFieldError::InvalidAttachments {
                    api_name: rules.api_name(),
                })?;
            ordered.push(attachment);
        }
        Ok(Rendered {
            value: ordered
                .iter()
                .map(|a| a.url.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            markdown: ordered
                .iter()
                .map(|a| format!("[{}]({})", a.name, a.url))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}
