pub mod account;
pub mod dashboard;
pub mod field_selection;
pub mod file_attachment;
pub mod notification;
pub mod task;
pub mod task_field;
pub mod template;
pub mod user;
pub mod workflow;
pub mod workflow_event;
