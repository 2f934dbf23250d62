//! Shared record types for nodehealth.
//!
//! Every diagnostic in the workspace normalizes tool output into one of the
//! flat records defined here. Records carry sentinels (`-1`, `"Unknown"`)
//! instead of failing when a field could not be read.

pub mod bandwidth;
pub mod burn;
pub mod error;
pub mod fabric;
pub mod gpu;
pub mod host;
pub mod link;
pub mod status;

pub use bandwidth::BandwidthRecord;
pub use burn::BurnRecord;
pub use error::{Error, Result};
pub use fabric::{Ipv6Fields, LatencyRecord, MappingRecord, RttccRecord};
pub use gpu::{
    EccCounters, GpuCheckKind, GpuHealthReport, GpuIssue, RemapCounts, ThrottleSample, XidEvent,
    XidSeverity,
};
pub use host::{FlapSummary, FleetStep, FleetStepResult, HostIdentity, HostSnapshot, StepStatus};
pub use link::{
    FEC_BIN_COUNT, FecHistogram, LANE_COUNT, LinkKey, LinkRecord, MISSING, MISSING_F64, UNKNOWN,
};
pub use status::{Severity, Status};
