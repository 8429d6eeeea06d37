//! HTTP routes for the visualization server.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    response::{Html, Json},
    routing::get,
};
use serde::Deserialize;
use tokio::sync::Mutex as TokioMutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use vizier_export::{Exporter, script_path};

use crate::error::{ServerError, ServerResult};
use crate::request::VisualizationRequest;

/// Application state shared across handlers.
pub struct AppState {
    /// The single exporter; requests take turns on its kernel.
    pub exporter: Arc<TokioMutex<Exporter>>,
    /// Directory holding `<type>.py` visualization scripts.
    pub types_dir: PathBuf,
}

impl AppState {
    pub fn new(exporter: Exporter, types_dir: impl Into<PathBuf>) -> Self {
        Self {
            exporter: Arc::new(TokioMutex::new(exporter)),
            types_dir: types_dir.into(),
        }
    }
}

/// Form body of a visualization request.
#[derive(Debug, Deserialize)]
pub struct VisualizeForm {
    /// Shell-style flags, e.g. `--type table --arguments '{}'`.
    pub arguments: String,
}

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(alive_handler).post(visualize_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
async fn alive_handler() -> &'static str {
    "alive"
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    // A running render holds the lock; report that instead of waiting
    let kernel = match state.exporter.try_lock() {
        Ok(exporter) => serde_json::json!({
            "busy": false,
            "pid": exporter.kernel_pid(),
        }),
        Err(_) => serde_json::json!({ "busy": true }),
    };

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "kernel": kernel,
    }))
}

/// Render a visualization and return it as HTML.
async fn visualize_handler(
    State(state): State<Arc<AppState>>,
    form: Result<Form<VisualizeForm>, FormRejection>,
) -> ServerResult<Html<String>> {
    let Form(form) = form.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let request_id = Uuid::new_v4();
    let request = VisualizationRequest::parse(&form.arguments)?;
    let script = script_path(&state.types_dir, &request.kind)?;
    tracing::info!(%request_id, "Generating visualization of type {}", request.kind);

    let mut exporter = state.exporter.clone().lock_owned().await;

    // Rendering does blocking IPC with the kernel
    let rendered = tokio::task::spawn_blocking(move || exporter.render(&request.params, &script))
        .await
        .map_err(|e| ServerError::Task(e.to_string()))??;

    tracing::info!(%request_id, "Visualization finished: {:?}", rendered.status);
    Ok(Html(rendered.html))
}
