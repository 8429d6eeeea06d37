//! Core engine for the Vizier visualization renderer.
//!
//! This crate provides:
//! - Parameter sets and the code cells built from them
//! - Documents (ordered cells plus their working directory)
//! - A persistent Python kernel session
//! - The execution preprocessor that runs documents against a session

pub mod cell;
pub mod document;
pub mod error;
pub mod execute;
pub mod kernel;
pub mod output;
pub mod params;

pub use cell::CodeCell;
pub use document::{Document, DocumentState, ExecutionStatus, FailureKind};
pub use error::{Error, Result};
pub use execute::{ExecutePreprocessor, ExecutionCallback};
pub use kernel::{CellExecution, KernelConfig, KernelSession};
pub use output::{CellOutput, OutputData};
pub use params::{ParameterQuoting, ParameterSet};
