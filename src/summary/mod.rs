//! Run metadata: host parallelism and the run summary record.

pub mod host;
pub mod record;

pub use host::HostCapacity;
pub use record::{RunSummary, SUMMARY_VERSION};
