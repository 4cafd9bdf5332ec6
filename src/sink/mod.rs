//! Result sinks.
//!
//! Independent workers report one [`AreaReport`] each, as soon as they finish.
//! Batch runs report one [`BatchReport`] per completed batch.

pub mod console;
pub mod jsonl;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::EngineResult;
use crate::request::IntegrationRequest;

pub use console::ConsoleSink;
pub use jsonl::JsonlSink;
pub use memory::MemorySink;

/// Result of a single integration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pub function_id: usize,
    pub range_start: f64,
    pub range_end: f64,
    pub num_steps: u64,
    pub area: f64,
}

impl AreaReport {
    pub fn new(request: &IntegrationRequest, area: f64) -> Self {
        AreaReport {
            function_id: request.function_id.index(),
            range_start: request.range_start,
            range_end: request.range_end,
            num_steps: request.num_steps,
            area,
        }
    }
}

impl fmt::Display for AreaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "function {} over [{},{}] ≈ {:.10}",
            self.function_id, self.range_start, self.range_end, self.area
        )
    }
}

/// Total reported after a batch has fully joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Zero-based batch number.
    pub batch: usize,
    /// Requests admitted into this batch.
    pub requests: usize,
    pub total: f64,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total ≈ {:.10}", self.total)
    }
}

/// Destination for worker results. Called concurrently from worker contexts.
pub trait ResultSink: Send + Sync {
    fn report_area(&self, report: &AreaReport) -> EngineResult<()>;

    fn report_total(&self, report: &BatchReport) -> EngineResult<()>;
}

impl<S: ResultSink + ?Sized> ResultSink for Arc<S> {
    fn report_area(&self, report: &AreaReport) -> EngineResult<()> {
        (**self).report_area(report)
    }

    fn report_total(&self, report: &BatchReport) -> EngineResult<()> {
        (**self).report_total(report)
    }
}

/// Forwards every report to each inner sink in order.
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn ResultSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        CompositeSink { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for CompositeSink {
    fn report_area(&self, report: &AreaReport) -> EngineResult<()> {
        for sink in &self.sinks {
            sink.report_area(report)?;
        }
        Ok(())
    }

    fn report_total(&self, report: &BatchReport) -> EngineResult<()> {
        for sink in &self.sinks {
            sink.report_total(report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_report_display() {
        let req = IntegrationRequest::new(0.0, 1.5, 10, 1).unwrap();
        let report = AreaReport::new(&req, 0.25);
        assert_eq!(report.to_string(), "function 1 over [0,1.5] ≈ 0.2500000000");
    }

    #[test]
    fn test_batch_report_display() {
        let report = BatchReport { batch: 0, requests: 2, total: 2.0 };
        assert_eq!(report.to_string(), "total ≈ 2.0000000000");
    }

    #[test]
    fn test_composite_fans_out() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let composite = CompositeSink::new().with(a.clone()).with(b.clone());
        assert_eq!(composite.len(), 2);

        let req = IntegrationRequest::new(0.0, 1.0, 1, 0).unwrap();
        composite.report_area(&AreaReport::new(&req, 1.0)).unwrap();
        composite
            .report_total(&BatchReport { batch: 0, requests: 1, total: 1.0 })
            .unwrap();

        assert_eq!(a.areas().len(), 1);
        assert_eq!(b.totals().len(), 1);
    }
}
