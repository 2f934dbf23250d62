use crate::bandwidth::BandwidthRecord;
use crate::burn::BurnRecord;
use crate::status::{Severity, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uncorrectable ECC counters for one GPU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EccCounters {
    pub gpu: String,
    pub volatile_sram: u64,
    pub volatile_dram: u64,
    pub aggregate_sram: u64,
    pub aggregate_dram: u64,
}

/// Row-remap counters for one GPU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapCounts {
    pub gpu: usize,
    pub pending: u64,
    pub failure: u64,
    pub uncorrectable: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XidSeverity {
    Critical,
    Warn,
}

impl fmt::Display for XidSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XidSeverity::Critical => write!(f, "Critical"),
            XidSeverity::Warn => write!(f, "Warn"),
        }
    }
}

/// Occurrences of one Xid code on one GPU PCI address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XidEvent {
    pub code: u32,
    pub pci: String,
    pub count: usize,
    pub description: String,
    pub severity: XidSeverity,
}

/// Active clock event reasons for one GPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleSample {
    pub gpu: usize,
    pub mask: u64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuCheckKind {
    Ecc,
    RowRemap,
    Xid,
    Throttle,
    Bandwidth,
    Burn,
}

impl fmt::Display for GpuCheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuCheckKind::Ecc => write!(f, "ecc"),
            GpuCheckKind::RowRemap => write!(f, "row_remap"),
            GpuCheckKind::Xid => write!(f, "xid"),
            GpuCheckKind::Throttle => write!(f, "throttle"),
            GpuCheckKind::Bandwidth => write!(f, "bandwidth"),
            GpuCheckKind::Burn => write!(f, "burn"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuIssue {
    pub check: GpuCheckKind,
    pub device: String,
    pub message: String,
    pub severity: Severity,
}

impl GpuIssue {
    /// Log line in the `check,serial,device - message` layout operators grep for.
    pub fn log_line(&self, host_serial: &str) -> String {
        format!(
            "{},{},{} - {}",
            self.check, host_serial, self.device, self.message
        )
    }
}

/// Combined result of the GPU checks run on one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuHealthReport {
    pub hostname: String,
    pub host_serial: String,
    pub checks_run: Vec<GpuCheckKind>,
    pub skipped: Vec<GpuCheckKind>,
    pub issues: Vec<GpuIssue>,
    #[serde(default)]
    pub xid_events: Vec<XidEvent>,
    #[serde(default)]
    pub bandwidth: Vec<BandwidthRecord>,
    #[serde(default)]
    pub burn: Vec<BurnRecord>,
    pub status: Status,
}

impl GpuHealthReport {
    pub fn new(hostname: impl Into<String>, host_serial: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            host_serial: host_serial.into(),
            checks_run: Vec::new(),
            skipped: Vec::new(),
            issues: Vec::new(),
            xid_events: Vec::new(),
            bandwidth: Vec::new(),
            burn: Vec::new(),
            status: Status::Passed,
        }
    }

    pub fn issues_for(&self, check: GpuCheckKind) -> impl Iterator<Item = &GpuIssue> {
        self.issues.iter().filter(move |issue| issue.check == check)
    }
}
