pub mod deployment;
pub mod error;
pub mod middleware;
pub mod routes;

use std::net::SocketAddr;

use thiserror::Error;
use tokio::{net::TcpListener, task::JoinHandle};

pub type DeploymentImpl = deployment::AppDeployment;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A server accepting connections in a background task.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

impl RunningServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Serves the API on the host and port from the deployment's config until
/// a shutdown signal arrives. Port 0 picks a free port.
pub async fn start_server(deployment: DeploymentImpl) -> Result<RunningServer, ServerError> {
    let addr = {
        let config = deployment.config().read().await;
        format!("{}:{}", config.host, config.port)
    };
    let app = routes::router(deployment).await;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(RunningServer { addr, handle })
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
