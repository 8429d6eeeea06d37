//! Error types for vizier-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for vizier-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vizier-core.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced script or template file is missing or unreadable.
    #[error("not found: {}: {message}", path.display())]
    NotFound { path: PathBuf, message: String },

    /// The interpreter subprocess failed to start or never became ready.
    #[error("kernel failed to start: {0}")]
    Startup(String),

    /// A cell ran longer than the configured timeout.
    #[error("cell {cell} timed out after {seconds}s")]
    Timeout { cell: usize, seconds: u64 },

    /// A cell raised an unhandled error inside the kernel.
    #[error("{ename}: {evalue}")]
    Execution { ename: String, evalue: String },

    /// Export was attempted on a document that has not been executed.
    #[error("document has not been executed")]
    NotExecuted,

    /// Unknown template kind or missing template file.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Parameter payload was not a JSON object.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Communication with the kernel process failed.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `NotFound` error from an IO failure on `path`.
    pub fn not_found(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::NotFound {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether the error came from setup (script, template, kernel start)
    /// rather than from a broken session.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Startup(_)
                | Self::TemplateNotFound(_)
                | Self::InvalidParameters(_)
        )
    }
}
