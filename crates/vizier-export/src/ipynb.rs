//! Jupyter notebook (.ipynb) output.
//!
//! Saves an executed document so it can be opened and inspected in Jupyter.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vizier_core::{CellOutput, CodeCell, Document};

use crate::error::{ExportError, ExportResult};

/// A Jupyter notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterNotebook {
    /// Notebook metadata
    pub metadata: JupyterMetadata,

    /// Format version (always 4)
    pub nbformat: u32,

    /// Minor format version
    pub nbformat_minor: u32,

    /// Notebook cells
    pub cells: Vec<JupyterCell>,
}

/// Jupyter notebook metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterMetadata {
    /// Kernel specification
    pub kernelspec: KernelSpec,

    /// Language info
    pub language_info: LanguageInfo,
}

/// Kernel specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSpec {
    pub display_name: String,
    pub language: String,
    pub name: String,
}

/// Language information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub file_extension: String,
    pub mimetype: String,
    pub name: String,
}

/// A Jupyter code cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterCell {
    /// Cell id, required since format 4.5
    pub id: String,

    /// Cell type
    pub cell_type: String,

    /// Cell metadata
    pub metadata: serde_json::Value,

    /// Cell source, split into lines that keep their newlines
    pub source: Vec<String>,

    /// Cell outputs
    pub outputs: Vec<CellOutput>,

    /// Execution count
    pub execution_count: Option<u32>,
}

impl JupyterNotebook {
    /// Create a new empty notebook.
    pub fn new() -> Self {
        Self {
            metadata: JupyterMetadata::default(),
            nbformat: 4,
            nbformat_minor: 5,
            cells: Vec::new(),
        }
    }

    /// Convert a document, keeping whatever outputs its cells carry.
    pub fn from_document(doc: &Document) -> Self {
        let mut notebook = Self::new();
        notebook.cells = doc
            .cells()
            .iter()
            .enumerate()
            .map(|(index, cell)| JupyterCell::from_cell(index, cell))
            .collect();
        notebook
    }

    /// Write the notebook to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ExportError::WriteError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::info!("Saved notebook to {}", path.display());
        Ok(())
    }
}

impl Default for JupyterNotebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for JupyterMetadata {
    fn default() -> Self {
        Self {
            kernelspec: KernelSpec {
                display_name: "Python 3".to_string(),
                language: "python".to_string(),
                name: "python3".to_string(),
            },
            language_info: LanguageInfo {
                file_extension: ".py".to_string(),
                mimetype: "text/x-python".to_string(),
                name: "python".to_string(),
            },
        }
    }
}

impl JupyterCell {
    fn from_cell(index: usize, cell: &CodeCell) -> Self {
        Self {
            id: format!("cell-{}", index),
            cell_type: "code".to_string(),
            metadata: serde_json::json!({}),
            source: split_source(&cell.source),
            outputs: cell.outputs.clone(),
            execution_count: cell.execution_count,
        }
    }

    /// Source text joined back into one string.
    pub fn source_text(&self) -> String {
        self.source.concat()
    }
}

/// Split into lines the way nbformat stores multi-line strings.
fn split_source(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(str::to_string).collect()
}
