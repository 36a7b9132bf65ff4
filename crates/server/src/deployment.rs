use std::sync::Arc;

use db::DBService;
use services::services::{
    config::Config, dashboard::DashboardService, notification::NotificationService,
    workflow::WorkflowService,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    notifications: NotificationService,
    dashboard: DashboardService,
    workflows: WorkflowService,
}

impl AppDeployment {
    /// Connects to the configured database and runs migrations.
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(config.database_url.as_deref()).await?;
        Ok(Self::from_db(db, config))
    }

    pub fn from_db(db: DBService, config: Config) -> Self {
        let notifications =
            NotificationService::new(db.pool.clone(), config.notifications.stream_capacity);
        let dashboard = DashboardService::new(db.pool.clone());
        let workflows = WorkflowService::new(db.pool.clone(), notifications.clone());
        Self {
            config: Arc::new(RwLock::new(config)),
            db,
            notifications,
            dashboard,
            workflows,
        }
    }

    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn dashboard(&self) -> &DashboardService {
        &self.dashboard
    }

    pub fn workflows(&self) -> &WorkflowService {
        &self.workflows
    }
}
