//! Execution progress callbacks.

use std::time::Duration;

use crate::document::FailureKind;

/// Callback trait for execution progress reporting.
pub trait ExecutionCallback: Send + Sync {
    /// Called when a cell starts executing.
    fn on_cell_started(&self, index: usize, source: &str);

    /// Called when a cell completes without an error.
    fn on_cell_completed(&self, index: usize, elapsed: Duration);

    /// Called when a cell raises an error or times out.
    fn on_cell_error(&self, index: usize, failure: &FailureKind);
}
