pub mod config;
pub mod dashboard;
pub mod markdown;
pub mod notification;
pub mod task_field;
pub mod workflow;
