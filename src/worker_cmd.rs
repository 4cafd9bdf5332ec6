use std::io::Write;

use tracing::debug;

use crate::integrate::integrate_request;
use crate::request::IntegrationRequest;
use crate::sink::AreaReport;
use crate::{EngineError, EngineResult};

/// Validate and integrate one request.
pub fn compute(start: f64, end: f64, steps: u64, function: usize) -> EngineResult<AreaReport> {
    let request = IntegrationRequest::new(start, end, steps, function)?;
    let area = integrate_request(&request);
    Ok(AreaReport::new(&request, area))
}

/// Worker process entry point: print the report as one JSON line on stdout.
pub fn run(start: f64, end: f64, steps: u64, function: usize) -> EngineResult<()> {
    let report = compute(start, end, steps, function)?;
    debug!(pid = std::process::id(), area = report.area, "worker done");
    let line = serde_json::to_string(&report).map_err(|e| EngineError::Message(e.to_string()))?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}
