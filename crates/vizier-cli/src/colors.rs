//! Terminal color constants and utilities for CLI output.

use std::io::{self, Write};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";

/// Flush stderr so progress without a trailing newline shows up.
///
/// Progress goes to stderr because stdout may carry the rendered HTML.
#[inline]
pub fn flush_stderr() {
    io::stderr().flush().ok();
}
