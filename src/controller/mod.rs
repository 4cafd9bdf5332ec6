//! Concurrency controller: bounded dispatch of integration requests.
//!
//! # Architecture
//!
//! - **`WorkerStrategy`**: how admitted requests are executed. Two
//!   implementations exist:
//!   - `IndependentStrategy` gates admission on a `CapacityGate` and runs every
//!     request in an isolated worker (child process or thread, chosen by a
//!     `WorkerLauncher`). Each worker reports its own area.
//!   - `BatchStrategy` fills a fixed number of `TaskSlots`, runs them as
//!     threads sharing one `Accumulator`, joins the whole batch and reports the
//!     total before starting the next.
//! - **`run`**: drives any strategy over a `RequestSource` and logs the outcome.
//!
//! # Failure model
//!
//! Spawn failures and synchronization failures are fatal and returned as
//! errors; nothing is retried. An invalid record simply ends the source.

pub mod batch;
pub mod capacity;
pub mod independent;
pub mod launcher;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::EngineResult;
use crate::config::{EngineConfig, Isolation, StrategyKind};
use crate::request::RequestSource;
use crate::sink::ResultSink;

pub use batch::{BatchStrategy, TaskSlots, WorkerTask};
pub use capacity::CapacityGate;
pub use independent::IndependentStrategy;
pub use launcher::{Completion, ProcessLauncher, ThreadLauncher, WorkerLauncher};

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub strategy: String,
    pub requests_admitted: usize,
    /// Batches reported (always zero for independent workers).
    pub batches: usize,
    /// Highest number of workers in flight at once.
    pub peak_active: usize,
    /// Final accumulated total (batch strategy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// A dispatch policy that consumes a request source to exhaustion.
pub trait WorkerStrategy: Send {
    /// Returns the strategy name (e.g., "independent", "batch").
    fn name(&self) -> &'static str;

    /// Admit and execute every request the source yields, blocking until all
    /// admitted work has completed.
    ///
    /// # Errors
    /// Returns `EngineError::WorkerSpawn`, `WorkerFailure` or
    /// `Synchronization` on fatal conditions.
    fn drive(&mut self, source: &mut dyn RequestSource) -> EngineResult<RunOutcome>;
}

/// Run `strategy` over `source` to completion.
pub fn run(
    source: &mut dyn RequestSource,
    strategy: &mut dyn WorkerStrategy,
) -> EngineResult<RunOutcome> {
    let start = Instant::now();
    info!(strategy = strategy.name(), "run started");
    let outcome = strategy.drive(source)?;
    info!(
        strategy = strategy.name(),
        admitted = outcome.requests_admitted,
        batches = outcome.batches,
        peak_active = outcome.peak_active,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(outcome)
}

/// Build the strategy selected by `config`, reporting into `sink`.
pub fn build_strategy(
    config: &EngineConfig,
    sink: Arc<dyn ResultSink>,
) -> EngineResult<Box<dyn WorkerStrategy>> {
    config.validate()?;
    match config.strategy {
        StrategyKind::Independent => {
            let launcher: Box<dyn WorkerLauncher> = match config.isolation {
                Isolation::Process => Box::new(ProcessLauncher::current_exe()?),
                Isolation::Thread => Box::new(ThreadLauncher::new()),
            };
            Ok(Box::new(IndependentStrategy::new(
                config.max_concurrent_workers,
                launcher,
                sink,
            )?))
        }
        StrategyKind::Batch => Ok(Box::new(BatchStrategy::new(
            config.batch_size,
            config.total_mode,
            sink,
        )?)),
    }
}
