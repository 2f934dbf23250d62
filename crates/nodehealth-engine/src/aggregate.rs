//! Ordering and roll-ups over a run's link records.

use nodehealth_core::natural_cmp;
use nodehealth_types::{LinkKey, LinkRecord, Severity};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

fn by_key(a: &LinkRecord, b: &LinkRecord) -> Ordering {
    natural_cmp(&a.hostname, &b.hostname).then_with(|| natural_cmp(&a.interface, &b.interface))
}

/// Natural order by hostname, then interface (`mlx5_2` before `mlx5_10`).
pub fn sort_records(records: &mut [LinkRecord]) {
    records.sort_by(by_key);
}

/// Worst links first: severity, then BER, then deepest FEC bin, then key.
pub fn failures_first(records: &mut [LinkRecord]) {
    records.sort_by(|a, b| {
        b.status
            .severity()
            .cmp(&a.status.severity())
            .then_with(|| b.raw_phy_ber.total_cmp(&a.raw_phy_ber))
            .then_with(|| {
                b.fec_bins
                    .highest_nonzero_bin()
                    .cmp(&a.fec_bins.highest_nonzero_bin())
            })
            .then_with(|| by_key(a, b))
    });
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub hosts: usize,
    pub links: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    /// Count per distinct status string.
    pub by_status: BTreeMap<String, usize>,
}

pub fn summarize(records: &[LinkRecord]) -> RunSummary {
    let mut summary = RunSummary {
        links: records.len(),
        ..RunSummary::default()
    };
    let mut hosts = BTreeSet::new();
    for record in records {
        hosts.insert(record.hostname.as_str());
        match record.status.severity() {
            Severity::Passed => summary.passed += 1,
            Severity::Warning => summary.warnings += 1,
            Severity::Failed => summary.failed += 1,
        }
        *summary
            .by_status
            .entry(record.status.to_string())
            .or_default() += 1;
    }
    summary.hosts = hosts.len();
    summary
}

pub fn failing_keys(records: &[LinkRecord]) -> BTreeSet<LinkKey> {
    records
        .iter()
        .filter(|r| r.status.is_failed())
        .map(LinkRecord::key)
        .collect()
}

/// Per-host counts, hosts in natural order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSummary {
    pub hostname: String,
    pub host_serial: String,
    pub links: usize,
    pub warnings: usize,
    pub failed: usize,
}

pub fn host_summaries(records: &[LinkRecord]) -> Vec<HostSummary> {
    let mut by_host: BTreeMap<&str, HostSummary> = BTreeMap::new();
    for record in records {
        let entry = by_host
            .entry(record.hostname.as_str())
            .or_insert_with(|| HostSummary {
                hostname: record.hostname.clone(),
                host_serial: record.host_serial.clone(),
                links: 0,
                warnings: 0,
                failed: 0,
            });
        entry.links += 1;
        match record.status.severity() {
            Severity::Warning => entry.warnings += 1,
            Severity::Failed => entry.failed += 1,
            Severity::Passed => {}
        }
    }
    let mut hosts: Vec<HostSummary> = by_host.into_values().collect();
    hosts.sort_by(|a, b| natural_cmp(&a.hostname, &b.hostname));
    hosts
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodehealth_types::Status;

    fn record(host: &str, iface: &str, status: Status, ber: f64) -> LinkRecord {
        let mut r = LinkRecord::sentinel(host, "SN", iface);
        r.status = status;
        r.raw_phy_ber = ber;
        r
    }

    #[test]
    fn test_natural_sort() {
        let mut records = vec![
            record("gpu-10", "mlx5_0", Status::Passed, 0.0),
            record("gpu-2", "mlx5_10", Status::Passed, 0.0),
            record("gpu-2", "mlx5_2", Status::Passed, 0.0),
        ];
        sort_records(&mut records);
        let keys: Vec<String> = records.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["gpu-2:mlx5_2", "gpu-2:mlx5_10", "gpu-10:mlx5_0"]);
    }

    #[test]
    fn test_failures_first() {
        let mut records = vec![
            record("a", "mlx5_0", Status::Passed, 1e-12),
            record("a", "mlx5_1", Status::warning("FecBin7 > 0"), 1e-12),
            record("a", "mlx5_2", Status::failed("RawPhyBER > 1e-7"), 2e-7),
            record("a", "mlx5_3", Status::failed("RawPhyBER > 1e-7"), 9e-7),
        ];
        failures_first(&mut records);
        let order: Vec<&str> = records.iter().map(|r| r.interface.as_str()).collect();
        assert_eq!(order, vec!["mlx5_3", "mlx5_2", "mlx5_1", "mlx5_0"]);
    }

    #[test]
    fn test_summaries() {
        let records = vec![
            record("gpu-1", "mlx5_0", Status::Passed, 0.0),
            record("gpu-1", "mlx5_1", Status::failed("LinkState = Down"), 0.0),
            record("gpu-2", "mlx5_0", Status::warning("FecBin8 > 0"), 0.0),
        ];
        let summary = summarize(&records);
        assert_eq!((summary.hosts, summary.links), (2, 3));
        assert_eq!((summary.passed, summary.warnings, summary.failed), (1, 1, 1));
        assert_eq!(summary.by_status["Failed - LinkState = Down"], 1);

        let hosts = host_summaries(&records);
        assert_eq!(hosts[0].hostname, "gpu-1");
        assert_eq!(hosts[0].failed, 1);
        assert_eq!(hosts[1].warnings, 1);

        let keys = failing_keys(&records);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&LinkKey::new("gpu-1", "mlx5_1")));
    }

    #[test]
    fn test_summary_json_shape() {
        let records = vec![
            record("gpu-1", "mlx5_0", Status::Passed, 0.0),
            record("gpu-1", "mlx5_1", Status::failed("LinkState = Down"), 0.0),
            record("gpu-2", "mlx5_0", Status::warning("FecBin8 > 0"), 0.0),
        ];
        insta::assert_json_snapshot!(summarize(&records), @r#"
        {
          "hosts": 2,
          "links": 3,
          "passed": 1,
          "warnings": 1,
          "failed": 1,
          "by_status": {
            "Failed - LinkState = Down": 1,
            "Passed": 1,
            "Warning - FecBin8 > 0": 1
          }
        }
        "#);
    }
}
