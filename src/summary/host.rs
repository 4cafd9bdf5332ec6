//! Host parallelism, recorded next to the configured worker limit.

use serde::{Deserialize, Serialize};

/// How many hardware threads the run had to share between its workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostCapacity {
    pub logical_cores: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_cores: Option<usize>,
}

impl HostCapacity {
    pub fn with_cores(logical_cores: usize, physical_cores: Option<usize>) -> Self {
        HostCapacity {
            logical_cores: logical_cores.max(1),
            physical_cores,
        }
    }

    /// Read the CPU topology. Falls back to the standard library's
    /// parallelism hint, then to a single core.
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_cpu();
        let logical = match sys.cpus().len() {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        Self::with_cores(logical, sys.physical_core_count())
    }

    /// Workers per logical core when `workers` run at once.
    pub fn load_factor(&self, workers: usize) -> f64 {
        workers as f64 / self.logical_cores as f64
    }
}
