use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const FIELD_COLUMNS: &str = r#"id, workflow_id, task_id, kickoff_workflow_id, field_template_id,
    field_type, name, description, api_name, "order", is_required, value,
    markdown_value, clear_value, user_id"#;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "field_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Radio,
    Checkbox,
    Dropdown,
    Date,
    Url,
    User,
    File,
}

impl FieldType {
    /// Types whose value is picked from a list of selections.
    pub fn has_selections(self) -> bool {
        matches!(self, FieldType::Radio | FieldType::Checkbox | FieldType::Dropdown)
    }
}

/// A task field lives either on a task or on the kickoff form of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FieldOwner {
    Task(Uuid),
    Kickoff(Uuid),
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct TaskField {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub task_id: Option<Uuid>,
    pub kickoff_workflow_id: Option<Uuid>,
    pub field_template_id: Option<Uuid>,
    pub field_type: FieldType,
    pub name: String,
    pub description: String,
    pub api_name: String,
    pub order: i64,
    pub is_required: bool,
    pub value: String,
    pub markdown_value: Option<String>,
    pub clear_value: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskField {
    pub workflow_id: Uuid,
    pub owner: FieldOwner,
    pub field_template_id: Option<Uuid>,
    pub field_type: FieldType,
    pub name: String,
    pub description: String,
    pub api_name: String,
    pub order: i64,
    pub is_required: bool,
    pub value: FieldValue,
}

/// Normalized value columns of a task field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    pub markdown_value: Option<String>,
    pub clear_value: Option<String>,
    pub user_id: Option<Uuid>,
}

impl TaskField {
    pub fn owner(&self) -> FieldOwner {
        match (self.task_id, self.kickoff_workflow_id) {
            (Some(task_id), _) => FieldOwner::Task(task_id),
            (None, Some(workflow_id)) => FieldOwner::Kickoff(workflow_id),
            // The table constraint guarantees one side is set.
            (None, None) => FieldOwner::Kickoff(self.workflow_id),
        }
    }

    pub async fn create<'e, E>(executor: E, data: &CreateTaskField) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (task_id, kickoff_workflow_id) = match data.owner {
            FieldOwner::Task(id) => (Some(id), None),
            FieldOwner::Kickoff(id) => (None, Some(id)),
        };
        sqlx::query_as::<_, TaskField>(&format!(
            r#"INSERT INTO task_fields (id, workflow_id, task_id, kickoff_workflow_id, field_template_id,
                   field_type, name, description, api_name, "order", is_required, value,
                   markdown_value, clear_value, user_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
               RETURNING {FIELD_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(data.workflow_id)
        .bind(task_id)
        .bind(kickoff_workflow_id)
        .bind(data.field_template_id)
        .bind(data.field_type)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.api_name)
        .bind(data.order)
        .bind(data.is_required)
        .bind(&data.value.value)
        .bind(&data.value.markdown_value)
        .bind(&data.value.clear_value)
        .bind(data.value.user_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TaskField>(&format!(
            "SELECT {FIELD_COLUMNS} FROM task_fields WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_task_id<'e, E>(
        executor: E,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TaskField>(&format!(
            r#"SELECT {FIELD_COLUMNS} FROM task_fields WHERE task_id = $1 ORDER BY "order" ASC, rowid ASC"#
        ))
        .bind(task_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_kickoff_fields<'e, E>(
        executor: E,
        workflow_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TaskField>(&format!(
            r#"SELECT {FIELD_COLUMNS} FROM task_fields WHERE kickoff_workflow_id = $1 ORDER BY "order" ASC, rowid ASC"#
        ))
        .bind(workflow_id)
        .fetch_all(executor)
        .await
    }

    pub async fn update_value<'e, E>(
        executor: E,
        id: Uuid,
        value: &FieldValue,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TaskField>(&format!(
            r#"UPDATE task_fields
               SET value = $2, markdown_value = $3, clear_value = $4, user_id = $5
               WHERE id = $1
               RETURNING {FIELD_COLUMNS}"#
        ))
        .bind(id)
        .bind(&value.value)
        .bind(&value.markdown_value)
        .bind(&value.clear_value)
        .bind(value.user_id)
        .fetch_optional(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_types() {
        assert!(FieldType::Radio.has_selections());
        assert!(FieldType::Checkbox.has_selections());
        assert!(FieldType::Dropdown.has_selections());
        assert!(!FieldType::File.has_selections());
    }

    #[test]
    fn field_type_round_trips_through_strings() {
        assert_eq!(FieldType::Url.to_string(), "url");
        assert_eq!("dropdown".parse::<FieldType>().unwrap(), FieldType::Dropdown);
    }
}
