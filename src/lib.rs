pub mod accumulator;
pub mod config;
pub mod controller;
pub mod functions_cmd;
pub mod integrate;
pub mod registry;
pub mod request;
pub mod run_cmd;
pub mod sink;
pub mod summary;
pub mod worker_cmd;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("function index {0} is out of range")]
    OutOfRange(i64),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("invalid function index {0}")]
    InvalidFunctionIndex(usize),
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
    #[error("worker failed: {0}")]
    WorkerFailure(String),
    #[error("synchronization failure: {0}")]
    Synchronization(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Current UTC time as an RFC 3339 string, empty if formatting fails.
pub fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}

pub fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) -> EngineResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| EngineError::Message(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_cause() {
        assert_eq!(
            EngineError::InvalidFunctionIndex(3).to_string(),
            "invalid function index 3"
        );
        assert_eq!(
            EngineError::WorkerFailure("exit 1".into()).to_string(),
            "worker failed: exit 1"
        );
    }

    #[test]
    fn test_write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_json(&path, &serde_json::json!({ "ok": true })).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["ok"], true);
    }
}
