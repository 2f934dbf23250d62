use crate::error::{Error, Result};
use crate::status::Status;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel for string fields that could not be read.
pub const UNKNOWN: &str = "Unknown";

/// Sentinel for integer fields that could not be read.
pub const MISSING: i64 = -1;

/// Sentinel for floating point fields that could not be read.
pub const MISSING_F64: f64 = -1.0;

/// Number of FEC histogram bins a record can hold.
pub const FEC_BIN_COUNT: usize = 16;

/// Number of physical lanes reported per port.
pub const LANE_COUNT: usize = 4;

/// Fixed-size FEC histogram. Bins the device did not report hold [`MISSING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FecHistogram(pub [i64; FEC_BIN_COUNT]);

impl Default for FecHistogram {
    fn default() -> Self {
        FecHistogram([MISSING; FEC_BIN_COUNT])
    }
}

impl FecHistogram {
    pub fn get(&self, bin: usize) -> i64 {
        self.0.get(bin).copied().unwrap_or(MISSING)
    }

    /// Store a bin count; bins past [`FEC_BIN_COUNT`] are dropped.
    pub fn set(&mut self, bin: usize, count: i64) {
        if let Some(slot) = self.0.get_mut(bin) {
            *slot = count;
        }
    }

    pub fn bins(&self) -> &[i64; FEC_BIN_COUNT] {
        &self.0
    }

    pub fn is_reported(&self) -> bool {
        self.0[0] != MISSING
    }

    /// Highest bin index holding a non-zero count.
    pub fn highest_nonzero_bin(&self) -> Option<usize> {
        self.0.iter().rposition(|&count| count > 0)
    }
}

/// Stable join key for a link across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub hostname: String,
    pub interface: String,
}

impl LinkKey {
    pub fn new(hostname: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.interface)
    }
}

impl FromStr for LinkKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once(':') {
            Some((host, iface)) if !host.is_empty() && !iface.is_empty() => {
                Ok(LinkKey::new(host, iface))
            }
            _ => Err(Error::InvalidKey(s.to_string())),
        }
    }
}

/// Normalized link health for one NIC interface on one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub hostname: String,
    pub host_serial: String,
    /// Address the host was reached at, when collected remotely.
    #[serde(default)]
    pub ip_addr: Option<String>,
    pub interface: String,
    pub link_state: String,
    pub firmware_version: String,
    pub vendor_name: String,
    pub cable_serial: String,
    pub raw_phy_ber: f64,
    pub eff_phy_ber: f64,
    pub eff_phy_errs: i64,
    pub raw_errors_per_lane: [i64; LANE_COUNT],
    pub fec_bins: FecHistogram,
    pub fec_histogram_supported: bool,
    pub recommendation: String,
    pub flap_count: u32,
    pub last_flap_time: Option<NaiveDateTime>,
    pub status: Status,
}

impl LinkRecord {
    /// A record with every measurement set to its sentinel.
    pub fn sentinel(
        hostname: impl Into<String>,
        host_serial: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            host_serial: host_serial.into(),
            ip_addr: None,
            interface: interface.into(),
            link_state: UNKNOWN.to_string(),
            firmware_version: UNKNOWN.to_string(),
            vendor_name: UNKNOWN.to_string(),
            cable_serial: UNKNOWN.to_string(),
            raw_phy_ber: MISSING_F64,
            eff_phy_ber: MISSING_F64,
            eff_phy_errs: MISSING,
            raw_errors_per_lane: [MISSING; LANE_COUNT],
            fec_bins: FecHistogram::default(),
            fec_histogram_supported: true,
            recommendation: UNKNOWN.to_string(),
            flap_count: 0,
            last_flap_time: None,
            status: Status::Passed,
        }
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(&self.hostname, &self.interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_record() {
        let record = LinkRecord::sentinel("gpu-1", "SN1", "mlx5_3");
        assert_eq!(record.link_state, UNKNOWN);
        assert_eq!(record.raw_phy_ber, MISSING_F64);
        assert_eq!(record.fec_bins.get(0), MISSING);
        assert!(!record.fec_bins.is_reported());
        assert_eq!(record.status, Status::Passed);
    }

    #[test]
    fn test_histogram_bounds() {
        let mut hist = FecHistogram::default();
        hist.set(3, 12);
        hist.set(99, 5);
        assert_eq!(hist.get(3), 12);
        assert_eq!(hist.get(99), MISSING);
        assert_eq!(hist.highest_nonzero_bin(), Some(3));
    }

    #[test]
    fn test_link_key_roundtrip() {
        let key: LinkKey = "hostA:mlx5_3".parse().unwrap();
        assert_eq!(key, LinkKey::new("hostA", "mlx5_3"));
        assert_eq!(key.to_string(), "hostA:mlx5_3");
        assert!("nocolon".parse::<LinkKey>().is_err());
    }
}
