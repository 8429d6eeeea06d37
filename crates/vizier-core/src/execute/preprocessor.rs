//! Cell-by-cell document execution.

use std::time::{Duration, Instant};

use crate::document::{Document, ExecutionStatus, FailureKind};
use crate::error::Result;
use crate::kernel::{CellExecution, KernelSession};
use crate::output::CellOutput;

use super::context::ExecutionCallback;

/// Name the structured parameter binding is visible under.
pub const VARIABLES_NAME: &str = "variables";

/// Runs a document's cells against a kernel session.
///
/// The session is borrowed mutably for the whole pass, so two documents can
/// never interleave on one interpreter.
pub struct ExecutePreprocessor {
    /// Per-cell timeout.
    timeout: Duration,
    /// Keep running later cells after one raises.
    allow_errors: bool,
    /// Execution callback for progress reporting
    callback: Option<Box<dyn ExecutionCallback>>,
}

impl ExecutePreprocessor {
    /// Create a preprocessor with a per-cell timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            allow_errors: false,
            callback: None,
        }
    }

    /// Continue with the next cell after an unhandled error instead of
    /// stopping. Timeouts always stop execution.
    pub fn allow_errors(mut self, allow: bool) -> Self {
        self.allow_errors = allow;
        self
    }

    /// Set the execution callback for progress reporting.
    pub fn with_callback(mut self, callback: impl ExecutionCallback + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Per-cell timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute every cell of `doc` in order.
    ///
    /// Errors raised by cells and timeouts are recorded on the cell and in
    /// the returned status; only a broken kernel connection is returned as
    /// `Err`.
    pub fn preprocess(
        &self,
        doc: &mut Document,
        kernel: &mut KernelSession,
    ) -> Result<ExecutionStatus> {
        for cell in doc.cells_mut() {
            cell.clear_outputs();
        }

        if let Some(variables) = doc.variables() {
            kernel.bind(VARIABLES_NAME, variables.to_json_value())?;
        }

        let cwd = doc.working_dir().to_path_buf();
        let mut status = ExecutionStatus::Succeeded;

        for index in 0..doc.len() {
            let source = doc.cells()[index].source.clone();
            if let Some(ref callback) = self.callback {
                callback.on_cell_started(index, &source);
            }

            let started = Instant::now();
            let result = kernel.execute(&source, Some(&cwd), self.timeout)?;
            let cell = &mut doc.cells_mut()[index];

            match result {
                CellExecution::Completed {
                    execution_count,
                    outputs,
                } => {
                    cell.execution_count = Some(execution_count);
                    cell.outputs = outputs;

                    let raised = cell.outputs.iter().find_map(|o| match o {
                        CellOutput::Error { ename, evalue, .. } => Some(FailureKind::Error {
                            ename: ename.clone(),
                            evalue: evalue.clone(),
                        }),
                        _ => None,
                    });

                    match raised {
                        Some(failure) => {
                            tracing::debug!("Cell {} raised: {:?}", index, failure);
                            if let Some(ref callback) = self.callback {
                                callback.on_cell_error(index, &failure);
                            }
                            if status.is_success() {
                                status = ExecutionStatus::Failed {
                                    cell: index,
                                    failure,
                                };
                            }
                            if !self.allow_errors {
                                break;
                            }
                        }
                        None => {
                            if let Some(ref callback) = self.callback {
                                callback.on_cell_completed(index, started.elapsed());
                            }
                        }
                    }
                }
                CellExecution::TimedOut { outputs } => {
                    let seconds = self.timeout.as_secs();
                    cell.outputs = outputs;
                    cell.outputs.push(timeout_output(self.timeout));

                    let failure = FailureKind::Timeout { seconds };
                    if let Some(ref callback) = self.callback {
                        callback.on_cell_error(index, &failure);
                    }
                    status = ExecutionStatus::Failed {
                        cell: index,
                        failure,
                    };
                    break;
                }
            }
        }

        doc.mark_executed(status.clone());
        Ok(status)
    }
}

fn timeout_output(timeout: Duration) -> CellOutput {
    let message = format!(
        "Cell execution timed out after {:.1} seconds",
        timeout.as_secs_f64()
    );
    CellOutput::error("TimeoutError", message.clone(), vec![format!("TimeoutError: {}", message)])
}
