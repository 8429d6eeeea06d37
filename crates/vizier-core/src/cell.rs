//! Code cells: the executable units a [`Document`](crate::document::Document)
//! is made of.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::output::CellOutput;
use crate::params::{ParameterQuoting, ParameterSet};

/// One block of source plus whatever it produced when executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeCell {
    /// Source text submitted to the kernel.
    pub source: String,
    /// Outputs captured during execution, in emission order.
    pub outputs: Vec<CellOutput>,
    /// Kernel execution counter, set once the cell has run.
    pub execution_count: Option<u32>,
}

impl CodeCell {
    /// Create a cell from source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            outputs: Vec::new(),
            execution_count: None,
        }
    }

    /// Create a cell that assigns every parameter to a variable of the same
    /// name, in sorted key order.
    ///
    /// An empty parameter set yields a cell with empty source.
    pub fn from_parameters(params: &ParameterSet, quoting: ParameterQuoting) -> Self {
        Self::new(params.to_assignments(quoting))
    }

    /// Create a cell from the verbatim contents of a script file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::not_found(path, &e))?;
        Ok(Self::new(source))
    }

    /// Create a cell from individual lines of code.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(source)
    }

    /// Whether any captured output is an error.
    pub fn has_error(&self) -> bool {
        self.outputs.iter().any(CellOutput::is_error)
    }

    /// Drop outputs from a previous run.
    pub fn clear_outputs(&mut self) {
        self.outputs.clear();
        self.execution_count = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parameters_empty() {
        let cell = CodeCell::from_parameters(&ParameterSet::new(), ParameterQuoting::Verbatim);
        assert!(cell.source.is_empty());
        assert!(cell.outputs.is_empty());
    }

    #[test]
    fn test_from_parameters_single() {
        let params = ParameterSet::from_json(r#"{"source": "gs://ml-pipeline/data.csv"}"#).unwrap();
        let cell = CodeCell::from_parameters(&params, ParameterQuoting::Verbatim);
        assert_eq!(cell.source, "source = \"gs://ml-pipeline/data.csv\"\n");
    }

    #[test]
    fn test_from_file_reads_verbatim() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("roc.py");
        fs::write(&path, "import os\nprint(source)\n").unwrap();

        let cell = CodeCell::from_file(&path).unwrap();
        assert_eq!(cell.source, "import os\nprint(source)\n");
    }

    #[test]
    fn test_from_file_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = CodeCell::from_file(temp.path().join("nope.py")).unwrap_err();
        match err {
            Error::NotFound { path, .. } => assert!(path.ends_with("nope.py")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_from_lines() {
        let cell = CodeCell::from_lines(["x = 2", "print(x)"]);
        assert_eq!(cell.source, "x = 2\nprint(x)");
    }

    #[test]
    fn test_clear_outputs() {
        let mut cell = CodeCell::new("print(1)");
        cell.outputs.push(CellOutput::error("ValueError", "bad", vec![]));
        cell.execution_count = Some(1);
        assert!(cell.has_error());

        cell.clear_outputs();
        assert!(!cell.has_error());
        assert!(cell.execution_count.is_none());
    }
}
