//! Check orchestration for nodehealth.
//!
//! Wires the collectors, normalizers and verdicts together for each command,
//! and owns the on-disk formats: config, reports and snapshots.

pub mod config;
pub mod error;
pub mod fabric;
pub mod fleet;
pub mod gpu;
pub mod link;
pub mod report;
pub mod snapshot;

pub use config::{
    Config, FabricConfig, FleetConfig, GpuConfig, LinkConfig, ReportConfig, resolve_config_path,
};
pub use error::{Error, Result};
pub use fleet::{Fleet, FleetJob, FleetOutcome};
pub use gpu::GpuCheck;
pub use link::{LinkCheck, LinkRun};
pub use report::ReportFormat;
