use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Capacity-gated independent workers, one result per request
    #[default]
    Independent,
    /// Fixed-size thread batches with a shared total
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Each independent worker is a child process
    #[default]
    Process,
    /// Each independent worker is an OS thread
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TotalMode {
    /// Batch totals keep accumulating across the whole run
    #[default]
    Cumulative,
    /// Batch totals restart from zero for every batch
    PerBatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: StrategyKind,
    pub max_concurrent_workers: usize,
    pub batch_size: usize,
    pub isolation: Isolation,
    pub total_mode: TotalMode,
    pub prompt: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strategy: StrategyKind::default(),
            max_concurrent_workers: DEFAULT_MAX_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            isolation: Isolation::default(),
            total_mode: TotalMode::default(),
            prompt: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrent_workers == 0 {
            return Err(EngineError::Config(
                "max_concurrent_workers must be at least 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EngineError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Command-line overrides; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub strategy: Option<StrategyKind>,
    pub max_concurrent_workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub isolation: Option<Isolation>,
    pub total_mode: Option<TotalMode>,
    pub prompt: bool,
}

impl ConfigOverrides {
    pub fn apply(self, mut cfg: EngineConfig) -> EngineConfig {
        if let Some(v) = self.strategy {
            cfg.strategy = v;
        }
        if let Some(v) = self.max_concurrent_workers {
            cfg.max_concurrent_workers = v;
        }
        if let Some(v) = self.batch_size {
            cfg.batch_size = v;
        }
        if let Some(v) = self.isolation {
            cfg.isolation = v;
        }
        if let Some(v) = self.total_mode {
            cfg.total_mode = v;
        }
        cfg.prompt |= self.prompt;
        cfg
    }
}

/// Load a config file. `.yaml`/`.yml` files are parsed as YAML, everything
/// else as TOML.
pub fn load_config(path: &Path) -> EngineResult<EngineConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let cfg: EngineConfig = if is_yaml {
        serde_yaml::from_str(&s).map_err(|e| EngineError::Config(e.to_string()))?
    } else {
        toml::from_str(&s).map_err(|e| EngineError::Config(e.to_string()))?
    };
    cfg.validate()?;
    Ok(cfg)
}

/// File config (or defaults) with command-line overrides applied, validated.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> EngineResult<EngineConfig> {
    let base = match path {
        Some(p) => load_config(p)?,
        None => EngineConfig::default(),
    };
    let cfg = overrides.apply(base);
    cfg.validate()?;
    Ok(cfg)
}
