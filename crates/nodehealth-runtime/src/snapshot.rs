//! Minimal host snapshots: raw mlxlink JSON plus the kernel state needed to
//! rebuild link records offline.

use crate::config::LinkConfig;
use crate::error::Result;
use crate::link::host_link_state;
use chrono::NaiveDateTime;
use nodehealth_core::{CommandRunner, run_bounded};
use nodehealth_engine::apply_flaps;
use nodehealth_providers::{LinkContext, mlxlink, normalize_link_json, rdma};
use nodehealth_types::{HostIdentity, HostSnapshot, LinkRecord};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn snapshot_file_name(hostname: &str) -> String {
    format!("mlxlink_info_min_{}.json", hostname)
}

/// Capture a snapshot of every configured interface.
///
/// Raw documents are keyed by PCI address from `mst status`. Interfaces
/// missing from the mst listing are keyed by device name instead.
pub async fn capture(
    runner: &dyn CommandRunner,
    config: &LinkConfig,
    identity: &HostIdentity,
    now: NaiveDateTime,
) -> HostSnapshot {
    let wanted: BTreeSet<String> = config.interfaces().into_iter().collect();

    let mst = runner.run(&rdma::mst_status_command()).await;
    if !mst.success() {
        warn!(reason = ?mst.failure_reason(), "mst status failed; keying snapshot by device");
    }
    let mst_status: BTreeMap<String, String> = rdma::parse_mst_status(&mst.stdout)
        .into_iter()
        .filter(|(_, device)| wanted.contains(device))
        .collect();

    let mut targets: Vec<(String, String)> = mst_status
        .iter()
        .map(|(pci, device)| (pci.clone(), device.clone()))
        .collect();
    let mapped: BTreeSet<&String> = mst_status.values().collect();
    targets.extend(
        wanted
            .iter()
            .filter(|device| !mapped.contains(device))
            .map(|device| (device.clone(), device.clone())),
    );

    let timeout = config.timeout();
    let outputs = run_bounded(targets, config.concurrency, |(key, device)| async move {
        let output = runner.run(&mlxlink::command(&device, timeout)).await;
        (key, device, output)
    })
    .await;

    let mut raw = BTreeMap::new();
    for (key, device, output) in outputs {
        match serde_json::from_str::<Value>(output.stdout.trim()) {
            Ok(doc) => {
                raw.insert(key, doc);
            }
            Err(_) => warn!(
                interface = %device,
                reason = %output.failure_reason().unwrap_or_else(|| "output is not JSON".to_string()),
                "no mlxlink document for snapshot"
            ),
        }
    }

    let state = host_link_state(runner, config, now).await;
    info!(host = %identity.hostname, documents = raw.len(), "captured link snapshot");

    HostSnapshot {
        hostname: identity.hostname.clone(),
        serial: identity.serial.clone(),
        boot_time: state.boot_time,
        rdma_link: state.rdma_link,
        mst_status,
        link_flaps: state.flaps,
        mlxlink: raw,
    }
}

pub fn write_snapshot(dir: &Path, snapshot: &HostSnapshot) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(snapshot_file_name(&snapshot.hostname));
    std::fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
    Ok(path)
}

pub fn read_snapshot(path: &Path) -> Result<HostSnapshot> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Unclassified link records for every document in the snapshot, with
/// recorded flaps applied.
pub fn snapshot_records(snapshot: &HostSnapshot) -> Vec<LinkRecord> {
    let mut records: Vec<LinkRecord> = snapshot
        .mlxlink
        .iter()
        .map(|(key, doc)| {
            let device = snapshot.mst_status.get(key).unwrap_or(key);
            let ctx = LinkContext {
                hostname: &snapshot.hostname,
                host_serial: &snapshot.serial,
                interface: device,
            };
            normalize_link_json(doc, &ctx)
        })
        .collect();
    apply_flaps(&mut records, &snapshot.link_flaps);
    records
}
