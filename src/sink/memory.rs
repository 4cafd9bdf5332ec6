//! In-memory sink for tests and programmatic callers.

use std::sync::Mutex;

use crate::{EngineError, EngineResult};

use super::{AreaReport, BatchReport, ResultSink};

/// Collects every report it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    areas: Mutex<Vec<AreaReport>>,
    totals: Mutex<Vec<BatchReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the per-request reports, in arrival order.
    pub fn areas(&self) -> Vec<AreaReport> {
        self.areas.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Snapshot of the batch totals, in arrival order.
    pub fn totals(&self) -> Vec<BatchReport> {
        self.totals.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl ResultSink for MemorySink {
    fn report_area(&self, report: &AreaReport) -> EngineResult<()> {
        self.areas
            .lock()
            .map_err(|e| EngineError::Synchronization(e.to_string()))?
            .push(report.clone());
        Ok(())
    }

    fn report_total(&self, report: &BatchReport) -> EngineResult<()> {
        self.totals
            .lock()
            .map_err(|e| EngineError::Synchronization(e.to_string()))?
            .push(report.clone());
        Ok(())
    }
}
