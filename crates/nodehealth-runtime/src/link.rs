//! Link health runs: live mlxlink collection or replay of saved output,
//! followed by flap merging, classification and sorting.

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::snapshot;
use chrono::NaiveDateTime;
use nodehealth_core::{CommandRunner, natural_cmp, run_bounded};
use nodehealth_engine::{apply_flaps, classify_all, count_flaps, sort_records};
use nodehealth_providers::topology::{is_frontend_pci, standardize_interface};
use nodehealth_providers::{
    LinkContext, Shape, dmesg, mlxlink, normalize_link, rdma, read_saved_link, uptime,
};
use nodehealth_types::{FlapSummary, HostIdentity, LinkRecord, UNKNOWN};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

static RAW_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)_(mlx5_\d+)\.json$").unwrap());
static SNAPSHOT_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mlxlink_info_min_(.+)\.json$").unwrap());

/// Kernel-side link state used for flap counting.
#[derive(Debug, Clone, Default)]
pub struct HostLinkState {
    pub boot_time: Option<NaiveDateTime>,
    /// netdev -> RDMA device
    pub rdma_link: BTreeMap<String, String>,
    /// RDMA device -> flap summary
    pub flaps: BTreeMap<String, FlapSummary>,
}

/// Read boot time, netdev map and kernel log, and count flaps as of `now`.
pub async fn host_link_state(
    runner: &dyn CommandRunner,
    config: &LinkConfig,
    now: NaiveDateTime,
) -> HostLinkState {
    let boot = runner.run(&uptime::command()).await;
    let boot_time = uptime::parse_boot_time(&boot.stdout);
    if boot_time.is_none() {
        warn!(reason = ?boot.failure_reason(), "boot time unknown; flap grace period not applied");
    }

    let links = runner.run(&rdma::rdma_link_command()).await;
    let rdma_link = rdma::parse_rdma_link(&links.stdout);

    let log = runner.run(&dmesg::command()).await;
    if !log.success() {
        warn!(reason = ?log.failure_reason(), "kernel log unavailable; link flaps not counted");
    }
    let events = dmesg::parse_link_events(&log.stdout);
    let flaps = count_flaps(&events, &rdma_link, boot_time, now, &config.flaps);
    debug!(events = events.len(), flapping = flaps.len(), "counted link flaps");

    HostLinkState {
        boot_time,
        rdma_link,
        flaps,
    }
}

/// Output of one live collection.
#[derive(Debug, Clone)]
pub struct LinkRun {
    pub records: Vec<LinkRecord>,
    /// interface -> raw mlxlink JSON, for interfaces that produced JSON
    pub raw: BTreeMap<String, Value>,
}

pub struct LinkCheck<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a LinkConfig,
}

impl<'a> LinkCheck<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a LinkConfig) -> Self {
        Self { runner, config }
    }

    /// Configured interfaces, else devices listed by `mst status` when
    /// discovery is on, else the shape's RDMA interfaces. Front-end slots
    /// are never checked.
    pub async fn interfaces(&self) -> Vec<String> {
        if self.config.interfaces.is_empty() && self.config.discover {
            let output = self.runner.run(&rdma::mst_status_command()).await;
            let mut found: Vec<String> = rdma::parse_mst_status(&output.stdout)
                .into_iter()
                .filter(|(pci, device)| {
                    let frontend = is_frontend_pci(pci);
                    if frontend {
                        debug!(%pci, %device, "skipping front-end device");
                    }
                    !frontend
                })
                .map(|(_, device)| device)
                .collect();
            if !found.is_empty() {
                found.sort_by(|a, b| natural_cmp(a, b));
                found.dedup();
                return found;
            }
            warn!(
                reason = ?output.failure_reason(),
                "mst discovery found no devices; using shape layout"
            );
        }
        self.config.interfaces()
    }

    /// Collect every configured interface and classify the results.
    ///
    /// One record per interface comes back even when mlxlink fails.
    pub async fn run(&self, identity: &HostIdentity, now: NaiveDateTime) -> LinkRun {
        let interfaces = self.interfaces().await;
        let timeout = self.config.timeout();
        let runner = self.runner;
        info!(
            host = %identity.hostname,
            interfaces = interfaces.len(),
            concurrency = self.config.concurrency,
            "collecting mlxlink"
        );

        let outputs = run_bounded(interfaces, self.config.concurrency, |interface| async move {
            let output = runner.run(&mlxlink::command(&interface, timeout)).await;
            (interface, output)
        })
        .await;

        let mut records = Vec::with_capacity(outputs.len());
        let mut raw = BTreeMap::new();
        for (interface, output) in outputs {
            let ctx = LinkContext {
                hostname: &identity.hostname,
                host_serial: &identity.serial,
                interface: &interface,
            };
            records.push(normalize_link(&output, &ctx));
            if let Ok(doc) = serde_json::from_str::<Value>(output.stdout.trim()) {
                raw.insert(interface, doc);
            }
        }

        let state = host_link_state(self.runner, self.config, now).await;
        apply_flaps(&mut records, &state.flaps);
        finalize(self.config, &mut records);
        LinkRun { records, raw }
    }

    /// Rebuild link records from saved files instead of running mlxlink.
    ///
    /// Reads `<hostname>_mlx5_<n>.json` raw files and
    /// `mlxlink_info_min_<hostname>.json` snapshots found directly in `dir`.
    /// Unreadable raw files still yield a sentinel record; unreadable
    /// snapshots are skipped. Only a missing `dir` is an error.
    pub fn replay(&self, dir: &Path) -> Result<Vec<LinkRecord>> {
        if !dir.is_dir() {
            return Err(Error::InvalidInput(format!(
                "replay directory not found: {}",
                dir.display()
            )));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            if SNAPSHOT_FILE.is_match(name) {
                match snapshot::read_snapshot(entry.path()) {
                    Ok(snapshot) => records.extend(snapshot::snapshot_records(&snapshot)),
                    Err(err) => warn!(file = name, error = %err, "skipping unreadable snapshot"),
                }
            } else if let Some(caps) = RAW_FILE.captures(name) {
                let ctx = LinkContext {
                    hostname: &caps[1],
                    host_serial: UNKNOWN,
                    interface: &caps[2],
                };
                let record = std::fs::read_to_string(entry.path())
                    .map_err(Error::from)
                    .and_then(|content| Ok(read_saved_link(&content, &ctx)?))
                    .unwrap_or_else(|err| {
                        warn!(file = name, error = %err, "unreadable raw mlxlink file");
                        LinkRecord::sentinel(ctx.hostname, ctx.host_serial, ctx.interface)
                    });
                records.push(record);
            }
        }
        info!(dir = %dir.display(), records = records.len(), "replayed saved mlxlink output");
        finalize(self.config, &mut records);
        Ok(records)
    }
}

/// Renumber, classify and sort records in place.
///
/// Devices with no H100 equivalent are reported as `<device>@<shape>` so
/// they cannot take a renumbered device's name. At most one record per
/// (hostname, interface) survives; the most severe one is kept.
pub fn finalize(config: &LinkConfig, records: &mut Vec<LinkRecord>) {
    if config.standardize && config.shape != Shape::H100 {
        for record in records.iter_mut() {
            match standardize_interface(config.shape, &record.interface) {
                Some(standard) => record.interface = standard,
                None => {
                    let native = format!("{}@{}", record.interface, config.shape);
                    debug!(
                        interface = %record.interface,
                        reported = %native,
                        "no H100 equivalent; keeping device name"
                    );
                    record.interface = native;
                }
            }
        }
    }
    classify_all(records, &config.thresholds, config.policy);
    sort_records(records);
    dedup_keys(records);
}

/// Collapse adjacent records sharing a key. Expects sorted input.
fn dedup_keys(records: &mut Vec<LinkRecord>) {
    let mut kept: Vec<LinkRecord> = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        match kept.last_mut() {
            Some(last) if last.key() == record.key() => {
                warn!(
                    host = %record.hostname,
                    interface = %record.interface,
                    "duplicate link record; keeping the most severe"
                );
                if record.status.severity() > last.status.severity() {
                    *last = record;
                }
            }
            _ => kept.push(record),
        }
    }
    *records = kept;
}

/// Write each raw document as `<hostname>_<interface>.json` under `dir`.
pub fn save_raw(dir: &Path, hostname: &str, raw: &BTreeMap<String, Value>) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(raw.len());
    for (interface, doc) in raw {
        let path = dir.join(format!("{}_{}.json", hostname, interface));
        std::fs::write(&path, serde_json::to_string_pretty(doc)?)?;
        written.push(path);
    }
    debug!(dir = %dir.display(), files = written.len(), "saved raw mlxlink output");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodehealth_testing::{SampleFiles, ScriptedRunner};
    use nodehealth_types::Status;
    use tempfile::TempDir;

    #[test]
    fn test_finalize_standardizes_h100t() {
        let config = LinkConfig {
            shape: Shape::H100T,
            ..LinkConfig::default()
        };
        let mut records = vec![LinkRecord::sentinel("h", "s", "mlx5_4")];
        finalize(&config, &mut records);
        assert_eq!(records[0].interface, "mlx5_3");
        assert!(records[0].status.is_failed());
    }

    #[test]
    fn test_finalize_keys_unique_on_h100t() {
        let config = LinkConfig {
            shape: Shape::H100T,
            ..LinkConfig::default()
        };
        let mut records: Vec<LinkRecord> = (0..20)
            .map(|i| LinkRecord::sentinel("h", "s", &format!("mlx5_{}", i)))
            .collect();
        finalize(&config, &mut records);

        assert_eq!(records.len(), 20);
        let keys: std::collections::BTreeSet<_> = records.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), 20);
        assert!(records.iter().any(|r| r.interface == "mlx5_13@h100t"));
        assert!(records.iter().any(|r| r.interface == "mlx5_3@h100t"));
    }

    #[test]
    fn test_finalize_keeps_most_severe_duplicate() {
        let healthy = SampleFiles::new().read("mlxlink_healthy.json").unwrap();
        let ctx = LinkContext {
            hostname: "h",
            host_serial: "s",
            interface: "mlx5_0",
        };
        let mut records = vec![
            read_saved_link(&healthy, &ctx).unwrap(),
            LinkRecord::sentinel("h", "s", "mlx5_0"),
            LinkRecord::sentinel("h", "s", "mlx5_1"),
        ];
        finalize(&LinkConfig::default(), &mut records);

        let interfaces: Vec<&str> = records.iter().map(|r| r.interface.as_str()).collect();
        assert_eq!(interfaces, vec!["mlx5_0", "mlx5_1"]);
        assert_eq!(records[0].status, Status::failed("Check interface mapping"));
    }

    #[test]
    fn test_replay_skips_bad_files() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::copy(
            SampleFiles::new().path("mlxlink_healthy.json"),
            dir.path().join("gpu-1_mlx5_0.json"),
        )?;
        std::fs::write(dir.path().join("gpu-1_mlx5_1.json"), b"\xff\xfe\x00")?;
        std::fs::write(dir.path().join("mlxlink_info_min_gpu-2.json"), "{ truncated")?;

        let config = LinkConfig::default();
        let records = LinkCheck::new(&ScriptedRunner::new(), &config).replay(dir.path())?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].interface, "mlx5_0");
        assert_eq!(records[0].status, Status::Passed);
        assert_eq!(records[1].interface, "mlx5_1");
        assert_eq!(records[1].status, Status::failed("Check interface mapping"));
        Ok(())
    }

    #[test]
    fn test_replay_missing_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = LinkConfig::default();
        let missing = dir.path().join("gone");
        let result = LinkCheck::new(&ScriptedRunner::new(), &config).replay(&missing);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_replay_raw_files() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("gpu-1_mlx5_0.json"), "{ not json")?;
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;
        let config = LinkConfig::default();
        let records = LinkCheck::new(&ScriptedRunner::new(), &config).replay(dir.path())?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hostname, "gpu-1");
        assert_eq!(records[0].status, Status::failed("Check interface mapping"));
        Ok(())
    }
}
