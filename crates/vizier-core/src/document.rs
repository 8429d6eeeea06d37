//! Documents: ordered cells executed together in one kernel context.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cell::CodeCell;
use crate::error::{Error, Result};
use crate::params::ParameterSet;

/// Where a document is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentState {
    /// No cells yet.
    Empty,
    /// Cells appended, not yet executed.
    Assembled,
    /// Executed, successfully or not.
    Executed(ExecutionStatus),
}

/// Outcome of executing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every cell ran without an unhandled error.
    Succeeded,
    /// Execution stopped at `cell`.
    Failed { cell: usize, failure: FailureKind },
}

/// Why execution of a cell failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The cell raised an error.
    Error { ename: String, evalue: String },
    /// The cell exceeded the timeout.
    Timeout { seconds: u64 },
}

impl ExecutionStatus {
    /// Whether execution completed without failure.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether execution stopped because of a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                failure: FailureKind::Timeout { .. },
                ..
            }
        )
    }

    /// Turn a failed status into the matching error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed {
                cell,
                failure: FailureKind::Timeout { seconds },
            } => Err(Error::Timeout { cell, seconds }),
            Self::Failed {
                failure: FailureKind::Error { ename, evalue },
                ..
            } => Err(Error::Execution { ename, evalue }),
        }
    }
}

/// An ordered sequence of code cells plus the context they run in.
///
/// Cells execute in exactly the order they were appended.
#[derive(Debug, Clone)]
pub struct Document {
    cells: Vec<CodeCell>,
    working_dir: PathBuf,
    variables: Option<ParameterSet>,
    state: DocumentState,
}

impl Document {
    /// Create an empty document rooted at the process's current directory.
    pub fn new() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_working_dir(working_dir)
    }

    /// Create an empty document whose cells run in `dir`.
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cells: Vec::new(),
            working_dir: dir.into(),
            variables: None,
            state: DocumentState::Empty,
        }
    }

    /// Append a cell at the end of the document.
    ///
    /// Appending to an executed document returns it to `Assembled`.
    pub fn append(&mut self, cell: CodeCell) -> &mut Self {
        self.cells.push(cell);
        self.state = DocumentState::Assembled;
        self
    }

    /// Bind `params` as a `variables` dict in the kernel before any cell runs.
    pub fn bind_variables(&mut self, params: ParameterSet) -> &mut Self {
        self.variables = Some(params);
        self
    }

    /// The structured variable binding, if any.
    pub fn variables(&self) -> Option<&ParameterSet> {
        self.variables.as_ref()
    }

    /// Directory cells execute in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Cells in execution order.
    pub fn cells(&self) -> &[CodeCell] {
        &self.cells
    }

    /// Mutable access to cells, used by the execution preprocessor.
    pub fn cells_mut(&mut self) -> &mut [CodeCell] {
        &mut self.cells
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the document has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Execution outcome, if the document has been executed.
    pub fn execution_status(&self) -> Option<&ExecutionStatus> {
        match &self.state {
            DocumentState::Executed(status) => Some(status),
            _ => None,
        }
    }

    /// Whether the document has been executed.
    pub fn is_executed(&self) -> bool {
        self.execution_status().is_some()
    }

    /// Record the outcome of an execution pass.
    pub fn mark_executed(&mut self, status: ExecutionStatus) {
        self.state = DocumentState::Executed(status);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
