//! Error types for vizier-export.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Errors that can occur while exporting a document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Error from the execution engine.
    #[error(transparent)]
    Core(#[from] vizier_core::Error),

    /// Template failed to parse or render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Failed to write an export artifact.
    #[error("failed to write {}: {message}", path.display())]
    WriteError { path: PathBuf, message: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// The underlying engine error, if this is one.
    pub fn core(&self) -> Option<&vizier_core::Error> {
        match self {
            Self::Core(err) => Some(err),
            _ => None,
        }
    }

    /// Whether a referenced script or template does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.core(),
            Some(vizier_core::Error::NotFound { .. } | vizier_core::Error::TemplateNotFound(_))
        )
    }
}
