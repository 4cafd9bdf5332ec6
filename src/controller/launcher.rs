//! Worker launchers for independent (capacity-gated) dispatch.
//!
//! A launcher starts one isolated worker per request and invokes the
//! completion callback exactly once when the worker is done, from whatever
//! thread observed the completion.

use std::io::BufRead;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::integrate::integrate_request;
use crate::request::IntegrationRequest;
use crate::sink::AreaReport;
use crate::{EngineError, EngineResult};

/// Called once per launched worker with its outcome.
pub type Completion = Box<dyn FnOnce(EngineResult<AreaReport>) + Send + 'static>;

/// Starts isolated workers.
pub trait WorkerLauncher: Send + Sync {
    /// Returns the launcher name (e.g., "process", "thread").
    fn name(&self) -> &str;

    /// Start a worker for `request`.
    ///
    /// # Errors
    /// Returns `EngineError::WorkerSpawn` if the worker could not be created.
    /// In that case `on_done` is never called.
    fn launch(&self, request: IntegrationRequest, on_done: Completion) -> EngineResult<()>;
}

/// Runs each request on a fresh OS thread that shares nothing with its
/// siblings except the completion path.
#[derive(Debug, Default)]
pub struct ThreadLauncher {
    launched: AtomicUsize,
}

impl ThreadLauncher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerLauncher for ThreadLauncher {
    fn name(&self) -> &str {
        "thread"
    }

    fn launch(&self, request: IntegrationRequest, on_done: Completion) -> EngineResult<()> {
        let n = self.launched.fetch_add(1, Ordering::Relaxed);
        std::thread::Builder::new()
            .name(format!("worker-{n}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| integrate_request(&request)))
                    .map(|area| AreaReport::new(&request, area))
                    .map_err(|_| EngineError::WorkerFailure(format!("worker-{n} panicked")));
                on_done(outcome);
            })
            .map_err(|e| EngineError::WorkerSpawn(e.to_string()))?;
        Ok(())
    }
}

/// Runs each request in a child process.
///
/// The child is this program's hidden `worker` subcommand; it prints a single
/// JSON `AreaReport` line on stdout. A reaper thread per child waits for it
/// and delivers the parsed report.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    /// Launch workers from the given executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        ProcessLauncher {
            program: program.into(),
        }
    }

    /// Launch workers from the currently running executable.
    pub fn current_exe() -> EngineResult<Self> {
        let program = std::env::current_exe()
            .map_err(|e| EngineError::WorkerSpawn(format!("cannot locate own executable: {e}")))?;
        Ok(Self::with_program(program))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, request: &IntegrationRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        // `=` form keeps negative bounds from being read as flags
        cmd.arg("worker")
            .arg(format!("--start={}", request.range_start))
            .arg(format!("--end={}", request.range_end))
            .arg(format!("--steps={}", request.num_steps))
            .arg(format!("--function={}", request.function_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

/// Extract the report from a worker's stdout: the last non-empty line.
pub fn parse_worker_output(stdout: &[u8]) -> EngineResult<AreaReport> {
    let line = stdout
        .lines()
        .map_while(Result::ok)
        .filter(|l| !l.trim().is_empty())
        .last()
        .ok_or_else(|| EngineError::WorkerFailure("worker produced no report".into()))?;
    serde_json::from_str(&line)
        .map_err(|e| EngineError::WorkerFailure(format!("unreadable worker report: {e}")))
}

impl WorkerLauncher for ProcessLauncher {
    fn name(&self) -> &str {
        "process"
    }

    fn launch(&self, request: IntegrationRequest, on_done: Completion) -> EngineResult<()> {
        let child = self
            .command(&request)
            .spawn()
            .map_err(|e| EngineError::WorkerSpawn(format!("failed to spawn worker process: {e}")))?;
        let pid = child.id();
        debug!(pid, "worker process started");

        std::thread::Builder::new()
            .name(format!("reaper-{pid}"))
            .spawn(move || {
                let outcome = child
                    .wait_with_output()
                    .map_err(|e| EngineError::WorkerFailure(format!("wait on worker {pid} failed: {e}")))
                    .and_then(|output| {
                        if !output.status.success() {
                            return Err(EngineError::WorkerFailure(format!(
                                "worker {pid} exited with status: {}",
                                output.status
                            )));
                        }
                        parse_worker_output(&output.stdout)
                    });
                debug!(pid, ok = outcome.is_ok(), "worker process reaped");
                on_done(outcome);
            })
            .map_err(|e| EngineError::WorkerSpawn(format!("failed to spawn reaper thread: {e}")))?;
        Ok(())
    }
}
