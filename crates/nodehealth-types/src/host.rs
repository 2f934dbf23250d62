use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub hostname: String,
    pub serial: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlapSummary {
    pub flap_count: u32,
    pub last_flap_time: Option<NaiveDateTime>,
}

/// Everything needed to rebuild a host's link records without touching the host.
///
/// Written as `mlxlink_info_min_<hostname>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub hostname: String,
    pub serial: String,
    pub boot_time: Option<NaiveDateTime>,
    /// netdev -> RDMA device
    #[serde(default)]
    pub rdma_link: BTreeMap<String, String>,
    /// PCI address -> RDMA device
    #[serde(default)]
    pub mst_status: BTreeMap<String, String>,
    /// RDMA device -> flap summary
    #[serde(default)]
    pub link_flaps: BTreeMap<String, FlapSummary>,
    /// PCI address -> raw mlxlink JSON
    #[serde(default)]
    pub mlxlink: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FleetStep {
    Setup,
    Distribute,
    Execute,
    Collect,
}

impl fmt::Display for FleetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetStep::Setup => write!(f, "setup"),
            FleetStep::Distribute => write!(f, "distribute"),
            FleetStep::Execute => write!(f, "execute"),
            FleetStep::Collect => write!(f, "collect"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Pass,
    Fail,
}

/// Outcome of one fleet step on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStepResult {
    pub host: String,
    pub step: FleetStep,
    pub status: StepStatus,
    pub command: String,
    pub output: String,
}
