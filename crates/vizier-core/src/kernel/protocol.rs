//! Wire protocol between a [`KernelSession`](super::KernelSession) and the
//! interpreter-side driver.
//!
//! Newline-delimited JSON over the child's stdin/stdout. The driver moves
//! the interpreter's own stdout away from the protocol descriptor before
//! running any user code, so a stray `print` can never break framing.

use std::io::{BufRead, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::output::CellOutput;

/// Largest accepted message, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Request sent from the session to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum KernelRequest {
    /// Check the driver is alive.
    Ping,

    /// Run one cell.
    Execute {
        /// Cell source.
        code: String,
        /// Directory to switch to before running, if any.
        cwd: Option<String>,
    },

    /// Bind `value` to a global name.
    Bind {
        name: String,
        value: serde_json::Value,
    },

    /// Clear the interpreter namespace.
    Reset,

    /// Exit the driver loop.
    Shutdown,
}

/// Reply sent from the driver to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum KernelReply {
    /// Answer to `Ping`.
    Pong {
        pid: u32,
        /// Interpreter version string.
        version: String,
    },

    /// One output of the running cell, sent as soon as it is produced.
    Output { output: CellOutput },

    /// The running cell finished, with or without an error output.
    Executed { execution_count: u32 },

    /// `Bind` applied.
    Bound,

    /// `Reset` applied.
    ResetDone,

    /// Acknowledgement of `Shutdown`.
    ShuttingDown,

    /// The driver could not understand a request.
    ProtocolError { message: String },
}

/// Write one message as a single JSON line and flush.
pub fn write_message<W: Write>(writer: &mut W, message: &impl Serialize) -> Result<()> {
    let mut line = serde_json::to_vec(message)
        .map_err(|e| Error::Ipc(format!("Failed to encode kernel message: {}", e)))?;
    line.push(b'\n');

    writer
        .write_all(&line)
        .map_err(|e| Error::Ipc(format!("Failed to write kernel message: {}", e)))?;
    writer
        .flush()
        .map_err(|e| Error::Ipc(format!("Failed to flush kernel stream: {}", e)))?;

    Ok(())
}

/// Read one JSON line.
///
/// End of stream is reported as an IPC error: the driver never closes its
/// side while the session is alive.
pub fn read_message<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut line = String::new();
    let read = reader
        .by_ref()
        .take(MAX_MESSAGE_SIZE as u64 + 1)
        .read_line(&mut line)
        .map_err(|e| Error::Ipc(format!("Failed to read kernel message: {}", e)))?;

    if read == 0 {
        return Err(Error::Ipc("kernel closed its output stream".to_string()));
    }
    if read > MAX_MESSAGE_SIZE {
        return Err(Error::Ipc(format!("kernel message too large: {} bytes", read)));
    }

    serde_json::from_str(line.trim_end())
        .map_err(|e| Error::Ipc(format!("Failed to decode kernel message: {}", e)))
}
