//! JSONL (JSON Lines) output for reports.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

use super::{AreaReport, BatchReport, ResultSink};

/// One line of a JSONL result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JsonlRecord {
    Area(AreaReport),
    Total(BatchReport),
}

/// Appends each report as a single JSON line.
///
/// The file is opened in append mode once; concurrent reports are serialized
/// through the file lock so every line is written whole.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open (creating parent directories and the file if needed).
    pub fn create(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Message(format!("failed to create directory: {e}"))
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::Message(format!("failed to open file: {e}")))?;
        Ok(JsonlSink {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &JsonlRecord) -> EngineResult<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| EngineError::Message(format!("failed to serialize record: {e}")))?;
        let mut file = self
            .file
            .lock()
            .map_err(|e| EngineError::Synchronization(format!("jsonl lock poisoned: {e}")))?;
        writeln!(file, "{}", json)
            .map_err(|e| EngineError::Message(format!("failed to write record: {e}")))?;
        Ok(())
    }
}

impl ResultSink for JsonlSink {
    fn report_area(&self, report: &AreaReport) -> EngineResult<()> {
        self.append(&JsonlRecord::Area(report.clone()))
    }

    fn report_total(&self, report: &BatchReport) -> EngineResult<()> {
        self.append(&JsonlRecord::Total(report.clone()))
    }
}

/// Read every record from a JSONL file, skipping blank lines.
pub fn read_records(path: &Path) -> EngineResult<Vec<JsonlRecord>> {
    let file = File::open(path)
        .map_err(|e| EngineError::Message(format!("failed to open file: {e}")))?;
    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            EngineError::Message(format!("failed to read line {}: {e}", line_num + 1))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            EngineError::Message(format!("failed to parse line {}: {e}", line_num + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}
