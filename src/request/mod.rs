//! Integration requests and the sources that produce them.

pub mod source;

use serde::{Deserialize, Serialize};

use crate::registry::FunctionId;
use crate::{EngineError, EngineResult};

pub use source::{IterRequestSource, RequestSource, TextRequestSource};

/// Prompt printed before each record when interactive prompting is on.
pub const PROMPT: &str = "Query: [start] [end] [numSteps] [funcId]";

/// One validated unit of work.
///
/// Deserialization goes through [`IntegrationRequest::new`], so a decoded
/// request upholds the same invariants as a parsed one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct IntegrationRequest {
    pub range_start: f64,
    pub range_end: f64,
    pub num_steps: u64,
    pub function_id: FunctionId,
}

impl IntegrationRequest {
    /// Build a request, enforcing `start <= end`, finite bounds, `steps > 0`
    /// and a registered function index.
    pub fn new(
        range_start: f64,
        range_end: f64,
        num_steps: u64,
        function_id: usize,
    ) -> EngineResult<Self> {
        if !range_start.is_finite() || !range_end.is_finite() {
            return Err(EngineError::MalformedRequest(format!(
                "range bounds must be finite, got [{range_start}, {range_end}]"
            )));
        }
        if range_end < range_start {
            return Err(EngineError::MalformedRequest(format!(
                "range end {range_end} is before start {range_start}"
            )));
        }
        if num_steps == 0 {
            return Err(EngineError::MalformedRequest(
                "step count must be positive".into(),
            ));
        }
        let function_id = FunctionId::new(function_id)?;
        Ok(IntegrationRequest {
            range_start,
            range_end,
            num_steps,
            function_id,
        })
    }
}

#[derive(Deserialize)]
struct RawRequest {
    range_start: f64,
    range_end: f64,
    num_steps: u64,
    function_id: usize,
}

impl TryFrom<RawRequest> for IntegrationRequest {
    type Error = EngineError;

    fn try_from(raw: RawRequest) -> EngineResult<Self> {
        IntegrationRequest::new(raw.range_start, raw.range_end, raw.num_steps, raw.function_id)
    }
}

/// Parse one four-field record: `start end steps funcId`.
pub fn parse_record(line: &str) -> EngineResult<IntegrationRequest> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(EngineError::MalformedRequest(format!(
            "expected 4 fields, got {}",
            fields.len()
        )));
    }
    parse_fields(fields[0], fields[1], fields[2], fields[3])
}

pub(crate) fn parse_fields(
    start: &str,
    end: &str,
    steps: &str,
    func: &str,
) -> EngineResult<IntegrationRequest> {
    let range_start: f64 = start
        .parse()
        .map_err(|_| EngineError::MalformedRequest(format!("bad range start '{start}'")))?;
    let range_end: f64 = end
        .parse()
        .map_err(|_| EngineError::MalformedRequest(format!("bad range end '{end}'")))?;
    let num_steps: u64 = steps
        .parse()
        .map_err(|_| EngineError::MalformedRequest(format!("bad step count '{steps}'")))?;
    let function_id: usize = func
        .parse()
        .map_err(|_| EngineError::MalformedRequest(format!("bad function id '{func}'")))?;
    IntegrationRequest::new(range_start, range_end, num_steps, function_id)
}
