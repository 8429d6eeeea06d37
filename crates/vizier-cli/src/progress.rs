//! Per-cell progress reporting on stderr.

use std::time::Duration;

use vizier_core::{ExecutionCallback, FailureKind};

use crate::colors;

/// Cell labels, in document order, for the standard two-cell document.
const CELL_LABELS: [&str; 2] = ["parameters", "script"];

/// Prints one line per executed cell.
pub struct ProgressCallback {
    verbose: bool,
}

impl ProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn label(index: usize) -> String {
        CELL_LABELS
            .get(index)
            .map(|l| l.to_string())
            .unwrap_or_else(|| format!("cell {}", index))
    }
}

impl ExecutionCallback for ProgressCallback {
    fn on_cell_started(&self, index: usize, source: &str) {
        eprint!(
            "{}  ▶ Running{} {}{}{}",
            colors::CYAN,
            colors::RESET,
            colors::BOLD,
            Self::label(index),
            colors::RESET
        );
        if self.verbose {
            let lines = source.lines().count();
            eprint!(" {}({} lines){}", colors::DIM, lines, colors::RESET);
        }
        eprint!("... ");
        colors::flush_stderr();
    }

    fn on_cell_completed(&self, _index: usize, elapsed: Duration) {
        eprintln!(
            "{}✓{} {}{:.2}s{}",
            colors::GREEN,
            colors::RESET,
            colors::DIM,
            elapsed.as_secs_f64(),
            colors::RESET
        );
    }

    fn on_cell_error(&self, _index: usize, failure: &FailureKind) {
        eprintln!("{}✗{}", colors::RED, colors::RESET);
        match failure {
            FailureKind::Error { ename, evalue } => {
                eprintln!("{}    Error:{} {}: {}", colors::RED, colors::RESET, ename, evalue);
            }
            FailureKind::Timeout { seconds } => {
                eprintln!(
                    "{}    Timed out{} after {}s",
                    colors::YELLOW,
                    colors::RESET,
                    seconds
                );
            }
        }
    }
}
