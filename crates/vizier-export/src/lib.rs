//! Export of executed Vizier documents.
//!
//! This crate provides:
//! - HTML rendering through `basic` and `full` templates
//! - `.ipynb` output of executed documents
//! - [`Exporter`], which owns a kernel session and renders visualization
//!   scripts end to end

pub mod error;
pub mod exporter;
pub mod html;
pub mod ipynb;
pub mod postprocess;
pub mod templates;

pub use error::{ExportError, ExportResult};
pub use exporter::{DEFAULT_TIMEOUT, Exporter, ExporterConfig, Rendered, script_path};
pub use html::HtmlExporter;
pub use ipynb::JupyterNotebook;
pub use templates::{TemplateKind, TemplateSet};
