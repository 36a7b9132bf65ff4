use server::{DeploymentImpl, ServerError, deployment::DeploymentError, start_server};
use services::services::config::load_config_from_file;
use thiserror::Error;
use utils::assets::{asset_dir, config_path};

#[derive(Debug, Error)]
pub enum WorkflowsServerError {
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[tokio::main]
async fn main() -> Result<(), WorkflowsServerError> {
    utils::logging::init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!("Asset directory: {}", asset_dir().display());
    let mut config = load_config_from_file(&config_path()).await;
    config.apply_env_overrides();

    let deployment = DeploymentImpl::new(config).await?;
    let server = start_server(deployment).await?;
    tracing::info!("Server running on {}", server.url());

    if let Err(e) = server.handle.await {
        tracing::error!("Server task failed: {}", e);
    }
    tracing::info!("Server stopped");
    Ok(())
}
