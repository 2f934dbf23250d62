//! Pure decision logic over normalized records.
//!
//! Nothing in this crate runs a command or touches the filesystem; every
//! function maps records and thresholds to verdicts.

pub mod aggregate;
pub mod classify;
pub mod diff;
pub mod fabric;
pub mod flaps;
pub mod gpu;

pub use aggregate::{HostSummary, RunSummary, failing_keys, failures_first, sort_records, summarize};
pub use classify::{ClassificationPolicy, LinkThresholds, classify, classify_all};
pub use diff::{FailureDiff, diff_failures};
pub use flaps::{FlapWindow, apply_flaps, count_flaps};
pub use gpu::GpuThresholds;
