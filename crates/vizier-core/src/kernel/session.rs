//! Long-lived interpreter process management.
//!
//! A [`KernelSession`] owns one Python process running the embedded driver.
//! It is started once and reused for every document so the interpreter's
//! startup cost is paid a single time.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::output::CellOutput;

use super::protocol::{KernelReply, KernelRequest, read_message, write_message};

/// Driver program run by the interpreter.
const DRIVER_SOURCE: &str = include_str!("driver.py");

/// Kernel startup and interruption settings.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Interpreter to launch. When unset, `python3` then `python` are
    /// looked up on `PATH`.
    pub python: Option<PathBuf>,
    /// How long to wait for the driver's first reply.
    pub startup_timeout: Duration,
    /// How long to wait for an interrupted cell to report back before the
    /// kernel is restarted.
    pub interrupt_grace: Duration,
    /// Extra environment variables for the interpreter.
    pub env: Vec<(String, String)>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            python: None,
            startup_timeout: Duration::from_secs(30),
            interrupt_grace: Duration::from_secs(5),
            env: Vec::new(),
        }
    }
}

/// Result of submitting one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellExecution {
    /// The cell ran to completion; an unhandled error shows up as an
    /// `error` output.
    Completed {
        execution_count: u32,
        outputs: Vec<CellOutput>,
    },
    /// The cell did not finish in time. `outputs` holds whatever it
    /// produced before it was interrupted, including when the kernel had to
    /// be restarted.
    TimedOut { outputs: Vec<CellOutput> },
}

/// The running interpreter and its pipes.
struct KernelProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    replies: Receiver<Result<KernelReply>>,
    reader: Option<JoinHandle<()>>,
    pid: u32,
    version: String,
}

impl KernelProcess {
    fn spawn(config: &KernelConfig) -> Result<Self> {
        let python = find_interpreter(config.python.as_deref())?;

        let mut command = Command::new(&python);
        command
            .arg("-u")
            .arg("-c")
            .arg(DRIVER_SOURCE)
            .env("MPLBACKEND", "Agg")
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()); // Interpreter warnings pass through for debugging
        for (key, value) in &config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| {
            Error::Startup(format!(
                "Failed to spawn interpreter '{}': {}",
                python.display(),
                e
            ))
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            abandon(&mut child);
            return Err(Error::Startup("Failed to get kernel pipes".to_string()));
        };

        let pid = child.id();
        let (tx, replies) = mpsc::channel();
        let reader = match thread::Builder::new()
            .name(format!("vizier-kernel-{}", pid))
            .spawn(move || {
                let mut stdout = BufReader::new(stdout);
                loop {
                    let message = read_message::<_, KernelReply>(&mut stdout);
                    let finished = message.is_err();
                    if tx.send(message).is_err() || finished {
                        break;
                    }
                }
            }) {
            Ok(reader) => reader,
            Err(e) => {
                abandon(&mut child);
                return Err(Error::Startup(format!("Failed to start kernel reader: {}", e)));
            }
        };

        let mut process = Self {
            child,
            stdin: BufWriter::new(stdin),
            replies,
            reader: Some(reader),
            pid,
            version: String::new(),
        };

        match process.handshake(config.startup_timeout) {
            Ok(version) => {
                tracing::info!(
                    "Kernel started (pid {}, {} {})",
                    pid,
                    python.display(),
                    version
                );
                process.version = version;
                Ok(process)
            }
            Err(e) => {
                tracing::warn!("Kernel {} failed to start: {}", pid, e);
                abandon(&mut process.child);
                // The reader exits on its own once the pipe closes
                drop(process.reader.take());
                Err(e)
            }
        }
    }

    /// Verify the driver is up with a ping and return its version.
    fn handshake(&mut self, timeout: Duration) -> Result<String> {
        self.send(&KernelRequest::Ping)
            .map_err(|e| Error::Startup(e.to_string()))?;
        match self.recv(timeout) {
            Ok(Some(KernelReply::Pong { version, .. })) => Ok(version),
            Ok(Some(other)) => Err(Error::Startup(format!(
                "Unexpected response from kernel: {:?}",
                other
            ))),
            Ok(None) => Err(Error::Startup(format!(
                "Kernel did not answer within {:?}",
                timeout
            ))),
            Err(e) => Err(Error::Startup(e.to_string())),
        }
    }

    fn send(&mut self, request: &KernelRequest) -> Result<()> {
        tracing::debug!("kernel <- {:?}", request);
        write_message(&mut self.stdin, request)
    }

    /// Wait for the next reply. `Ok(None)` means the wait timed out.
    fn recv(&mut self, timeout: Duration) -> Result<Option<KernelReply>> {
        match self.replies.recv_timeout(timeout) {
            Ok(Ok(reply)) => {
                tracing::debug!("kernel -> {}", reply_summary(&reply));
                Ok(Some(reply))
            }
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Ipc("kernel reader stopped".to_string()))
            }
        }
    }

    fn interrupt(&self) {
        #[cfg(unix)]
        {
            // SIGINT raises KeyboardInterrupt inside the running cell
            unsafe {
                libc::kill(self.pid as libc::pid_t, libc::SIGINT);
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Ask the driver to exit, killing it if it does not.
    fn terminate(mut self) {
        let graceful = self.send(&KernelRequest::Shutdown).is_ok()
            && matches!(
                self.recv(Duration::from_secs(2)),
                Ok(Some(KernelReply::ShuttingDown))
            )
            && self.wait_exit(Duration::from_secs(2));

        if !graceful {
            abandon(&mut self.child);
        }

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        tracing::info!("Kernel {} stopped", self.pid);
    }

    fn wait_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(_) => return false,
            }
        }
        false
    }
}

/// Kill a kernel process and reap it.
fn abandon(child: &mut Child) {
    if let Err(e) = child.kill() {
        // InvalidInput means the process already exited
        if e.kind() != std::io::ErrorKind::InvalidInput {
            tracing::warn!("Failed to kill kernel {}: {}", child.id(), e);
        }
    }
    // Wait to reap zombie
    let _ = child.wait();
}

/// Append an output, merging it into the previous one when both are
/// chunks of the same stream.
fn push_output(outputs: &mut Vec<CellOutput>, output: CellOutput) {
    if let (
        Some(CellOutput::Stream { name, text }),
        CellOutput::Stream {
            name: next_name,
            text: next_text,
        },
    ) = (outputs.last_mut(), &output)
    {
        if name == next_name {
            text.push_str(next_text);
            return;
        }
    }
    outputs.push(output);
}

/// A persistent interpreter shared by every document executed through it.
///
/// All operations take `&mut self`: a session runs one request at a time.
/// Interpreter state (variables, imports) persists across cells and across
/// documents until [`reset`](Self::reset) or [`restart`](Self::restart).
pub struct KernelSession {
    config: KernelConfig,
    process: Option<KernelProcess>,
}

impl KernelSession {
    /// Launch the interpreter and block until the driver answers.
    pub fn start(config: KernelConfig) -> Result<Self> {
        let process = KernelProcess::spawn(&config)?;
        Ok(Self {
            config,
            process: Some(process),
        })
    }

    /// Pay first-execution costs before the first real request.
    pub fn warm_up(&mut self) -> Result<()> {
        let started = Instant::now();
        match self.execute("", None, self.config.startup_timeout)? {
            CellExecution::Completed { .. } => {
                tracing::debug!("Kernel warmed up in {:?}", started.elapsed());
                Ok(())
            }
            CellExecution::TimedOut { .. } => Err(Error::Startup(
                "kernel did not finish warm-up execution".to_string(),
            )),
        }
    }

    /// Run one cell with `cwd` as the working directory.
    ///
    /// When the cell exceeds `timeout` the interpreter is interrupted. If it
    /// does not report back within the configured grace period the kernel
    /// is restarted, which discards its state.
    pub fn execute(
        &mut self,
        code: &str,
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CellExecution> {
        let interrupt_grace = self.config.interrupt_grace;
        let process = self.process_mut()?;

        process.send(&KernelRequest::Execute {
            code: code.to_string(),
            cwd: cwd.map(|p| p.to_string_lossy().into_owned()),
        })?;

        let mut outputs = Vec::new();
        let deadline = Instant::now() + timeout;
        loop {
            match process.recv(deadline.saturating_duration_since(Instant::now()))? {
                Some(KernelReply::Output { output }) => push_output(&mut outputs, output),
                Some(KernelReply::Executed { execution_count }) => {
                    return Ok(CellExecution::Completed {
                        execution_count,
                        outputs,
                    });
                }
                Some(other) => {
                    return Err(Error::Ipc(format!(
                        "Unexpected response when executing: {:?}",
                        other
                    )));
                }
                None => break,
            }
        }

        tracing::warn!("Cell exceeded {:?}, interrupting kernel {}", timeout, process.pid);
        process.interrupt();

        let deadline = Instant::now() + interrupt_grace;
        loop {
            match process.recv(deadline.saturating_duration_since(Instant::now())) {
                Ok(Some(KernelReply::Output { output })) => push_output(&mut outputs, output),
                Ok(Some(KernelReply::Executed { .. })) => {
                    outputs.retain(|o| {
                        !matches!(o, CellOutput::Error { ename, .. } if ename == "KeyboardInterrupt")
                    });
                    return Ok(CellExecution::TimedOut { outputs });
                }
                _ => {
                    tracing::warn!("Kernel did not respond to interrupt, restarting");
                    self.restart()?;
                    return Ok(CellExecution::TimedOut { outputs });
                }
            }
        }
    }

    /// Bind a JSON value to a global name in the interpreter.
    pub fn bind(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        let timeout = self.config.startup_timeout;
        let process = self.process_mut()?;
        process.send(&KernelRequest::Bind {
            name: name.to_string(),
            value,
        })?;
        match process.recv(timeout)? {
            Some(KernelReply::Bound) => Ok(()),
            other => Err(Error::Ipc(format!("Unexpected response to bind: {:?}", other))),
        }
    }

    /// Clear every user-defined name from the interpreter.
    pub fn reset(&mut self) -> Result<()> {
        let timeout = self.config.startup_timeout;
        let process = self.process_mut()?;
        process.send(&KernelRequest::Reset)?;
        match process.recv(timeout)? {
            Some(KernelReply::ResetDone) => Ok(()),
            other => Err(Error::Ipc(format!("Unexpected response to reset: {:?}", other))),
        }
    }

    /// Replace the interpreter with a fresh one.
    pub fn restart(&mut self) -> Result<()> {
        self.shutdown();
        self.process = Some(KernelProcess::spawn(&self.config)?);
        Ok(())
    }

    /// Stop the interpreter. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(process) = self.process.take() {
            process.terminate();
        }
    }

    /// Whether the interpreter process is still running.
    pub fn is_alive(&mut self) -> bool {
        self.process.as_mut().is_some_and(KernelProcess::is_alive)
    }

    /// Process ID of the interpreter, if running.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.pid)
    }

    /// Interpreter version reported at startup.
    pub fn version(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.version.as_str())
    }

    fn process_mut(&mut self) -> Result<&mut KernelProcess> {
        self.process
            .as_mut()
            .ok_or_else(|| Error::Ipc("kernel is not running".to_string()))
    }
}

impl Drop for KernelSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Find the interpreter binary.
///
/// Looks in the following order:
/// 1. The configured path
/// 2. `python3` on `PATH`
/// 3. `python` on `PATH`
pub fn find_interpreter(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        // Bare names like "python3.11" are resolved through PATH
        return which::which(path).map_err(|_| {
            Error::Startup(format!("interpreter not found: {}", path.display()))
        });
    }

    for name in ["python3", "python"] {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(Error::Startup(
        "Could not find a Python interpreter. Set VIZIER_PYTHON or put python3 on PATH."
            .to_string(),
    ))
}

fn reply_summary(reply: &KernelReply) -> String {
    match reply {
        KernelReply::Output { output } => match output {
            CellOutput::Stream { name, text } => format!("{} ({} bytes)", name, text.len()),
            CellOutput::ExecuteResult { .. } => "execute_result".to_string(),
            CellOutput::DisplayData { .. } => "display_data".to_string(),
            CellOutput::Error { ename, .. } => format!("error ({})", ename),
        },
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert!(config.python.is_none());
        assert_eq!(config.startup_timeout, Duration::from_secs(30));
        assert!(config.interrupt_grace < config.startup_timeout);
    }

    #[test]
    fn test_missing_configured_interpreter() {
        let err = find_interpreter(Some(Path::new("/nonexistent/bin/python9"))).unwrap_err();
        assert!(matches!(err, Error::Startup(_)));
    }

    #[test]
    fn test_start_with_missing_interpreter_fails() {
        let config = KernelConfig {
            python: Some(PathBuf::from("/nonexistent/bin/python9")),
            ..Default::default()
        };
        assert!(matches!(KernelSession::start(config), Err(Error::Startup(_))));
    }

    #[test]
    fn test_stream_chunks_are_merged() {
        let mut outputs = Vec::new();
        push_output(&mut outputs, CellOutput::stdout("a"));
        push_output(&mut outputs, CellOutput::stdout("b\n"));
        push_output(
            &mut outputs,
            CellOutput::Stream {
                name: "stderr".to_string(),
                text: "warn\n".to_string(),
            },
        );
        push_output(&mut outputs, CellOutput::stdout("c\n"));

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0], CellOutput::stdout("ab\n"));
        assert_eq!(outputs[2], CellOutput::stdout("c\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unresponsive_interpreter_is_killed() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let pid_file = temp.path().join("pid");
        let script = temp.path().join("silent-python");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 600\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = KernelConfig {
            python: Some(script),
            startup_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let err = KernelSession::start(config).err().expect("start should fail");
        assert!(matches!(err, Error::Startup(_)), "{:?}", err);

        let pid: libc::pid_t = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let alive = unsafe { libc::kill(pid, 0) } == 0;
        assert!(!alive, "interpreter {} still running", pid);
    }

    #[test]
    fn test_driver_is_embedded() {
        assert!(DRIVER_SOURCE.contains("def main()"));
    }
}
