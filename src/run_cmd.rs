use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::{ConfigOverrides, EngineConfig, resolve_config};
use crate::controller::{self, RunOutcome, build_strategy};
use crate::request::TextRequestSource;
use crate::sink::{CompositeSink, ConsoleSink, JsonlSink, ResultSink};
use crate::summary::{HostCapacity, RunSummary};
use crate::{EngineError, EngineResult, write_json};

/// Everything the `run` command needs.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Records file; stdin when `None`
    pub input: Option<PathBuf>,
    /// TOML or YAML engine config
    pub config: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    /// Append every report to this JSONL file
    pub jsonl: Option<PathBuf>,
    /// Write a JSON run summary here
    pub summary: Option<PathBuf>,
}

fn open_input(input: Option<&PathBuf>) -> EngineResult<Box<dyn BufRead + Send>> {
    match input {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| EngineError::Message(format!("{}: {e}", path.display())))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

pub fn build_sink(jsonl: Option<&PathBuf>) -> EngineResult<Arc<dyn ResultSink>> {
    let mut sink = CompositeSink::new().with(Arc::new(ConsoleSink::stdout()));
    if let Some(path) = jsonl {
        sink = sink.with(Arc::new(JsonlSink::create(path)?));
    }
    Ok(Arc::new(sink))
}

/// Drive a run with an explicit config, sink and reader.
pub fn execute(
    config: &EngineConfig,
    reader: Box<dyn BufRead + Send>,
    sink: Arc<dyn ResultSink>,
) -> EngineResult<RunOutcome> {
    let mut strategy = build_strategy(config, sink)?;
    let mut source = TextRequestSource::new(reader).with_prompt(config.prompt);
    controller::run(&mut source, strategy.as_mut())
}

pub fn run(args: RunArgs) -> EngineResult<RunOutcome> {
    let config = resolve_config(args.config.as_deref(), args.overrides)?;
    info!(?config, "resolved configuration");

    let reader = open_input(args.input.as_ref())?;
    let sink = build_sink(args.jsonl.as_ref())?;

    let start = Instant::now();
    let outcome = execute(&config, reader, sink)?;
    let elapsed_ms = start.elapsed().as_millis();

    if let Some(path) = args.summary {
        let summary = RunSummary::new(&config, &outcome, elapsed_ms, HostCapacity::detect());
        if summary.oversubscribed() {
            warn!(
                worker_limit = summary.worker_limit,
                logical_cores = summary.host.logical_cores,
                "worker limit exceeds available cores"
            );
        }
        write_json(&path, &summary)?;
        info!(path = %path.display(), "wrote run summary");
    }

    Ok(outcome)
}
