//! Machine-readable summary of a finished run.

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, StrategyKind};
use crate::controller::RunOutcome;

use super::host::HostCapacity;

/// Schema version for forward compatibility
pub const SUMMARY_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,

    /// RFC 3339 timestamp of when the run finished
    pub timestamp: String,

    pub strategy: StrategyKind,
    pub max_concurrent_workers: usize,
    pub batch_size: usize,

    pub requests_admitted: usize,
    pub batches: usize,
    pub peak_active: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,

    pub elapsed_ms: u128,

    pub host: HostCapacity,

    /// Most workers the chosen strategy may run at once.
    pub worker_limit: usize,

    /// `worker_limit` per logical core; above 1.0 the host is oversubscribed.
    pub load_factor: f64,
}

/// Concurrency ceiling of the configured strategy.
pub fn worker_limit(config: &EngineConfig) -> usize {
    match config.strategy {
        StrategyKind::Independent => config.max_concurrent_workers,
        StrategyKind::Batch => config.batch_size,
    }
}

impl RunSummary {
    pub fn new(
        config: &EngineConfig,
        outcome: &RunOutcome,
        elapsed_ms: u128,
        host: HostCapacity,
    ) -> Self {
        let worker_limit = worker_limit(config);
        RunSummary {
            schema_version: SUMMARY_VERSION,
            timestamp: crate::now_string(),
            strategy: config.strategy,
            max_concurrent_workers: config.max_concurrent_workers,
            batch_size: config.batch_size,
            requests_admitted: outcome.requests_admitted,
            batches: outcome.batches,
            peak_active: outcome.peak_active,
            total: outcome.total,
            elapsed_ms,
            load_factor: host.load_factor(worker_limit),
            worker_limit,
            host,
        }
    }

    pub fn oversubscribed(&self) -> bool {
        self.load_factor > 1.0
    }
}
