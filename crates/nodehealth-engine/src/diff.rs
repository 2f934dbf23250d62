//! Run-to-run comparison of failing links.

use crate::aggregate::sort_records;
use nodehealth_types::{LinkKey, LinkRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// Links whose failed state changed since the previous run.
///
/// Both lists hold records from the current run, so a recovered link shows
/// its new passing measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FailureDiff {
    pub newly_failed: Vec<LinkRecord>,
    pub recovered: Vec<LinkRecord>,
}

impl FailureDiff {
    pub fn is_empty(&self) -> bool {
        self.newly_failed.is_empty() && self.recovered.is_empty()
    }
}

/// Compare current records against the keys that failed last time.
///
/// A previously failing link that is absent from the current run is not
/// reported as recovered.
pub fn diff_failures(previous_failing: &BTreeSet<LinkKey>, current: &[LinkRecord]) -> FailureDiff {
    let mut diff = FailureDiff::default();
    for record in current {
        let was_failing = previous_failing.contains(&record.key());
        match (was_failing, record.status.is_failed()) {
            (false, true) => diff.newly_failed.push(record.clone()),
            (true, false) => diff.recovered.push(record.clone()),
            _ => {}
        }
    }
    sort_records(&mut diff.newly_failed);
    sort_records(&mut diff.recovered);
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodehealth_types::Status;

    fn record(host: &str, iface: &str, failed: bool) -> LinkRecord {
        let mut r = LinkRecord::sentinel(host, "SN", iface);
        r.status = if failed {
            Status::failed("RawPhyBER > 1e-7")
        } else {
            Status::Passed
        };
        r
    }

    #[test]
    fn test_diff() {
        let previous = BTreeSet::from([
            LinkKey::new("hostA", "mlx5_0"),
            LinkKey::new("hostA", "mlx5_1"),
            LinkKey::new("hostC", "mlx5_0"),
        ]);
        let current = vec![
            record("hostA", "mlx5_0", true),
            record("hostA", "mlx5_1", false),
            record("hostB", "mlx5_5", true),
        ];
        let diff = diff_failures(&previous, &current);
        let keys = |v: &[LinkRecord]| v.iter().map(|r| r.key().to_string()).collect::<Vec<_>>();
        assert_eq!(keys(&diff.newly_failed), vec!["hostB:mlx5_5"]);
        // hostC is gone from the current run and is not counted as recovered
        assert_eq!(keys(&diff.recovered), vec!["hostA:mlx5_1"]);
    }

    #[test]
    fn test_no_previous_failures() {
        let current = vec![record("hostA", "mlx5_0", false)];
        assert!(diff_failures(&BTreeSet::new(), &current).is_empty());
    }
}
