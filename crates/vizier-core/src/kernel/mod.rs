//! Persistent interpreter kernels.
//!
//! This module provides the protocol and process management for the
//! long-lived Python interpreter that executes document cells.
//!
//! ```text
//! KernelSession (parent)
//!     │
//!     └── python -u -c <driver.py>
//!             │
//!             ├── JSON line: {"op": "execute", ...}
//!             │       └── runs cell, captures stdout/stderr, rich display, errors
//!             │
//!             ├── JSON line: {"reply": "executed", "outputs": [...]}
//!             │
//!             └── SIGINT on timeout, restart if it does not answer
//! ```

pub mod protocol;
mod session;

pub use protocol::{KernelReply, KernelRequest, read_message, write_message};
pub use session::{CellExecution, KernelConfig, KernelSession, find_interpreter};
