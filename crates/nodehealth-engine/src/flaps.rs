//! Link flap counting from kernel link-down events.

use chrono::{Duration, NaiveDateTime};
use nodehealth_providers::dmesg::LinkEvent;
use nodehealth_types::{FlapSummary, LinkRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlapWindow {
    /// Only events younger than this count.
    pub window_secs: i64,
    /// Events this soon after boot are link bring-up, not flaps.
    pub grace_secs: i64,
}

impl Default for FlapWindow {
    fn default() -> Self {
        Self {
            window_secs: 86_400,
            grace_secs: 1_800,
        }
    }
}

impl FlapWindow {
    fn counts(
        &self,
        event: NaiveDateTime,
        now: NaiveDateTime,
        boot: Option<NaiveDateTime>,
    ) -> bool {
        if now - event >= Duration::seconds(self.window_secs) {
            return false;
        }
        match boot {
            Some(boot) => event - boot > Duration::seconds(self.grace_secs),
            None => true,
        }
    }
}

/// Down events per RDMA device, keyed through the netdev map.
///
/// Events on netdevs with no RDMA device are dropped.
pub fn count_flaps(
    events: &[LinkEvent],
    netdevs: &BTreeMap<String, String>,
    boot_time: Option<NaiveDateTime>,
    now: NaiveDateTime,
    window: &FlapWindow,
) -> BTreeMap<String, FlapSummary> {
    let mut flaps: BTreeMap<String, FlapSummary> = BTreeMap::new();
    for event in events.iter().filter(|e| e.is_down()) {
        let Some(device) = netdevs.get(&event.netdev) else {
            debug!(netdev = %event.netdev, "link event on netdev without rdma device");
            continue;
        };
        if !window.counts(event.time, now, boot_time) {
            continue;
        }
        let summary = flaps.entry(device.clone()).or_default();
        summary.flap_count += 1;
        summary.last_flap_time = summary.last_flap_time.max(Some(event.time));
    }
    flaps
}

pub fn apply_flaps(records: &mut [LinkRecord], flaps: &BTreeMap<String, FlapSummary>) {
    for record in records.iter_mut() {
        if let Some(summary) = flaps.get(&record.interface) {
            record.flap_count = summary.flap_count;
            record.last_flap_time = summary.last_flap_time;
        }
    }
}
