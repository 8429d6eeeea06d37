//! Document execution.
//!
//! [`ExecutePreprocessor`] runs a [`Document`](crate::document::Document)'s
//! cells, in order, against a [`KernelSession`](crate::kernel::KernelSession)
//! and attaches what each cell produced.
//!
//! # Module Structure
//!
//! - `context` - Execution progress callbacks
//! - `preprocessor` - Cell-by-cell execution with timeout and error policy

mod context;
mod preprocessor;

pub use context::ExecutionCallback;
pub use preprocessor::ExecutePreprocessor;
