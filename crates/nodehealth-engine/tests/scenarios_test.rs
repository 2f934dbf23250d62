//! End-to-end decisions over realistic record sets.

use chrono::NaiveDate;
use nodehealth_engine::gpu::{ecc_issues, overall_status, remap_issues};
use nodehealth_engine::{
    ClassificationPolicy, FlapWindow, GpuThresholds, LinkThresholds, apply_flaps, classify_all,
    count_flaps, diff_failures, failing_keys,
};
use nodehealth_providers::dmesg::LinkEvent;
use nodehealth_types::{EccCounters, LinkKey, LinkRecord, RemapCounts, Severity, Status};
use std::collections::{BTreeMap, BTreeSet};

fn active(host: &str, iface: &str, ber: f64) -> LinkRecord {
    let mut record = LinkRecord::sentinel(host, "SN-1", iface);
    record.link_state = "Active".to_string();
    record.raw_phy_ber = ber;
    record.eff_phy_errs = 0;
    for bin in 0..16 {
        record.fec_bins.set(bin, if bin == 0 { 1_000 } else { 0 });
    }
    record
}

#[test]
fn ber_threshold_boundary() {
    let mut records = vec![active("hostA", "mlx5_0", 5e-8), active("hostA", "mlx5_1", 2e-7)];
    classify_all(&mut records, &LinkThresholds::default(), ClassificationPolicy::default());
    assert_eq!(records[0].status, Status::Passed);
    assert_eq!(records[1].status.to_string(), "Failed - RawPhyBER > 1e-7");
}

#[test]
fn clean_ecc_is_passed() {
    let counters: Vec<EccCounters> = (0..8)
        .map(|i| EccCounters {
            gpu: format!("GPU {}", i),
            ..Default::default()
        })
        .collect();
    let issues = ecc_issues(&counters);
    assert!(issues.is_empty());
    assert_eq!(overall_status(&issues), Status::Passed);
}

#[test]
fn remap_failure_vs_warning() {
    let rows = vec![
        RemapCounts { gpu: 0, uncorrectable: 600, ..Default::default() },
        RemapCounts { gpu: 1, uncorrectable: 400, ..Default::default() },
    ];
    let issues = remap_issues(&rows, &GpuThresholds::default());
    assert_eq!(issues[0].severity, Severity::Failed);
    assert_eq!(issues[1].severity, Severity::Warning);
}

#[test]
fn flap_during_boot_grace_is_ignored() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
    let boot = day.and_hms_opt(9, 0, 0).unwrap();
    let events = vec![LinkEvent {
        time: day.and_hms_opt(9, 20, 0).unwrap(),
        netdev: "eth4".to_string(),
        state: "Down".to_string(),
    }];
    let netdevs = BTreeMap::from([("eth4".to_string(), "mlx5_3".to_string())]);
    let now = day.and_hms_opt(12, 0, 0).unwrap();

    let flaps = count_flaps(&events, &netdevs, Some(boot), now, &FlapWindow::default());
    assert!(flaps.is_empty());

    let mut records = vec![active("hostA", "mlx5_3", 1e-12)];
    apply_flaps(&mut records, &flaps);
    classify_all(&mut records, &LinkThresholds::default(), ClassificationPolicy::default());
    assert!(records[0].status.is_passed());
}

#[test]
fn recovered_link_is_reported_once() {
    let previous = BTreeSet::from([LinkKey::new("hostA", "mlx5_3")]);
    let mut current = vec![active("hostA", "mlx5_3", 1e-12), active("hostA", "mlx5_4", 1e-12)];
    classify_all(&mut current, &LinkThresholds::default(), ClassificationPolicy::default());

    let diff = diff_failures(&previous, &current);
    assert_eq!(diff.recovered.len(), 1);
    assert_eq!(diff.recovered[0].key(), LinkKey::new("hostA", "mlx5_3"));
    assert!(diff.newly_failed.is_empty());
}

#[test]
fn diff_lists_are_disjoint() {
    let mut previous_run = vec![
        active("hostA", "mlx5_0", 3e-7),
        active("hostA", "mlx5_1", 1e-12),
        active("hostB", "mlx5_0", 3e-7),
    ];
    classify_all(&mut previous_run, &LinkThresholds::default(), ClassificationPolicy::default());
    let previous = failing_keys(&previous_run);

    let mut current = vec![
        active("hostA", "mlx5_0", 1e-12),
        active("hostA", "mlx5_1", 3e-7),
        active("hostB", "mlx5_0", 3e-7),
    ];
    classify_all(&mut current, &LinkThresholds::default(), ClassificationPolicy::default());
    let diff = diff_failures(&previous, &current);

    let new: BTreeSet<_> = diff.newly_failed.iter().map(LinkRecord::key).collect();
    let recovered: BTreeSet<_> = diff.recovered.iter().map(LinkRecord::key).collect();
    assert!(new.is_disjoint(&recovered));
    assert_eq!(new, BTreeSet::from([LinkKey::new("hostA", "mlx5_1")]));
    assert_eq!(recovered, BTreeSet::from([LinkKey::new("hostA", "mlx5_0")]));
}
