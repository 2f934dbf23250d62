use crate::status::Status;
use serde::{Deserialize, Serialize};

/// One osu_latency measurement between two interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyRecord {
    pub client: String,
    pub server: String,
    pub client_interface: String,
    pub server_interface: String,
    pub latency_us: f64,
    pub status: Status,
}

/// RTTCC state of one NIC. `enabled` is `None` when the register could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RttccRecord {
    pub interface: String,
    pub enabled: Option<bool>,
    pub status: Status,
}

/// Observed RDMA device for a PCI address compared to the expected layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub pci: String,
    pub observed: String,
    pub expected: Vec<String>,
    pub status: Status,
}

/// Fields packed into the upper 64 bits of an RDMA IPv6 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Fields {
    pub cluster_id: u32,
    pub tor_id: u16,
    pub isolation_id: u16,
    pub interface_id: u16,
}
