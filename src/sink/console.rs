//! Human-readable line output.

use std::io::Write;
use std::sync::Mutex;

use crate::{EngineError, EngineResult};

use super::{AreaReport, BatchReport, ResultSink};

/// Writes one line per report. Lines from concurrent workers never interleave.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        ConsoleSink { out: Mutex::new(out) }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn write_line(&self, line: &dyn std::fmt::Display) -> EngineResult<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|e| EngineError::Synchronization(format!("console lock poisoned: {e}")))?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl ResultSink for ConsoleSink {
    fn report_area(&self, report: &AreaReport) -> EngineResult<()> {
        self.write_line(report)
    }

    fn report_total(&self, report: &BatchReport) -> EngineResult<()> {
        self.write_line(report)
    }
}
