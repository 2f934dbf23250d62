//! Verdicts for NIC fabric checks: RTTCC, PCI mapping and rail latency.

use nodehealth_core::natural_cmp;
use nodehealth_providers::topology::expected_devices;
use nodehealth_types::{LatencyRecord, MappingRecord, RttccRecord, Status};
use std::collections::BTreeMap;

/// Latency above this, in microseconds, fails a rail pair.
pub const DEFAULT_LATENCY_CUTOFF_US: f64 = 3.2;

/// RTTCC must be disabled on RDMA NICs.
pub fn rttcc_verdict(interface: &str, enabled: Option<bool>) -> RttccRecord {
    let status = match enabled {
        Some(false) => Status::Passed,
        Some(true) => Status::failed("RTTCC enabled"),
        None => Status::warning("RTTCC state unreadable"),
    };
    RttccRecord {
        interface: interface.to_string(),
        enabled,
        status,
    }
}

/// Check each observed PCI -> device pair against the expected layout.
pub fn mapping_verdicts(observed: &BTreeMap<String, String>) -> Vec<MappingRecord> {
    let mut records: Vec<MappingRecord> = observed
        .iter()
        .map(|(pci, device)| {
            let expected = expected_devices(pci);
            let status = if expected.is_empty() {
                Status::warning("Unexpected PCI slot")
            } else if expected.contains(device) {
                Status::Passed
            } else {
                Status::failed(format!("{} expected one of {}", device, expected.join("/")))
            };
            MappingRecord {
                pci: pci.clone(),
                observed: device.clone(),
                expected,
                status,
            }
        })
        .collect();
    records.sort_by(|a, b| natural_cmp(&a.observed, &b.observed));
    records
}

pub fn latency_status(latency_us: Option<f64>, cutoff_us: f64) -> Status {
    match latency_us {
        None => Status::failed("osu_latency produced no result"),
        Some(us) if us > cutoff_us => {
            Status::failed(format!("Latency {:.2}us > {}us", us, cutoff_us))
        }
        Some(_) => Status::Passed,
    }
}

pub fn latency_record(
    client: (&str, &str),
    server: (&str, &str),
    latency_us: Option<f64>,
    cutoff_us: f64,
) -> LatencyRecord {
    LatencyRecord {
        client: client.0.to_string(),
        client_interface: client.1.to_string(),
        server: server.0.to_string(),
        server_interface: server.1.to_string(),
        latency_us: latency_us.unwrap_or(nodehealth_types::MISSING_F64),
        status: latency_status(latency_us, cutoff_us),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rttcc() {
        assert!(rttcc_verdict("mlx5_0", Some(false)).status.is_passed());
        assert!(rttcc_verdict("mlx5_0", Some(true)).status.is_failed());
        assert_eq!(
            rttcc_verdict("mlx5_0", None).status,
            Status::warning("RTTCC state unreadable")
        );
    }

    #[test]
    fn test_mapping() {
        let observed = BTreeMap::from([
            ("0c:00.0".to_string(), "mlx5_18".to_string()),
            ("0c:00.1".to_string(), "mlx5_7".to_string()),
            ("ff:00.0".to_string(), "mlx5_40".to_string()),
        ]);
        let records = mapping_verdicts(&observed);
        assert_eq!(records[0].observed, "mlx5_7");
        assert_eq!(records[0].status, Status::failed("mlx5_7 expected one of mlx5_1/mlx5_19"));
        assert!(records[1].status.is_passed());
        assert_eq!(records[2].status, Status::warning("Unexpected PCI slot"));
    }

    #[test]
    fn test_latency() {
        let ok = latency_record(
            ("gpu-1", "mlx5_0"),
            ("gpu-2", "mlx5_0"),
            Some(2.87),
            DEFAULT_LATENCY_CUTOFF_US,
        );
        assert!(ok.status.is_passed());
        let slow = latency_status(Some(6.5), DEFAULT_LATENCY_CUTOFF_US);
        assert_eq!(slow, Status::failed("Latency 6.50us > 3.2us"));
        let missing = latency_record(
            ("gpu-1", "mlx5_0"),
            ("gpu-2", "mlx5_1"),
            None,
            DEFAULT_LATENCY_CUTOFF_US,
        );
        assert_eq!(missing.latency_us, -1.0);
        assert!(missing.status.is_failed());
    }
}
