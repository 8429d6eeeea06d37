//! Vizier visualization server.
//!
//! Serves rendered visualizations over HTTP:
//! - `GET /` answers `alive`
//! - `POST /` with a form field `arguments` renders a visualization
//! - `GET /health` reports server and kernel status
//!
//! One [`Exporter`] (and so one kernel) serves every request, one at a time.

pub mod error;
pub mod request;
pub mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use vizier_export::Exporter;

pub use error::{ServerError, ServerResult};
pub use request::{VisualizationArgs, VisualizationRequest, split_shell_words};
pub use routes::{AppState, create_router};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory holding `<type>.py` visualization scripts.
    pub types_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            types_dir: PathBuf::from("visualizations"),
        }
    }
}

/// Serve visualizations until Ctrl+C, then shut the kernel down.
pub async fn serve(exporter: Exporter, config: ServerConfig) -> ServerResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ServerError::Io {
            path: PathBuf::new(),
            message: format!("Invalid address: {}:{}", config.host, config.port),
        })?;

    let state = Arc::new(AppState::new(exporter, config.types_dir.clone()));
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving visualizations from {} at http://{}", config.types_dir.display(), addr);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    // Handle Ctrl+C for graceful shutdown
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;

    state.exporter.lock().await.shutdown();
    tracing::info!("Server shutdown complete");

    Ok(())
}
