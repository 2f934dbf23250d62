//! Verdicts for the per-GPU health checks.

use nodehealth_types::{
    BandwidthRecord, BurnRecord, EccCounters, GpuCheckKind, GpuIssue, MISSING_F64, RemapCounts,
    Severity, Status, ThrottleSample, XidEvent, XidSeverity,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Clock event bits that do not indicate a slowdown.
pub const BENIGN_CLOCK_EVENTS: u64 = 0x1 | 0x4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuThresholds {
    pub remap_uncorrectable_limit: u64,
    /// Minimum mean host-to-device bandwidth, GB/s.
    pub htod_min_gbps: f64,
    /// Minimum mean device-to-host bandwidth, GB/s.
    pub dtoh_min_gbps: f64,
    /// Minimum peak gpu_burn throughput, Gflop/s.
    pub burn_min_gflops: f64,
    /// Maximum gpu_burn temperature, Celsius.
    pub burn_max_temp_c: i64,
}

impl Default for GpuThresholds {
    fn default() -> Self {
        Self {
            remap_uncorrectable_limit: 512,
            htod_min_gbps: 52.0,
            dtoh_min_gbps: 52.0,
            burn_min_gflops: 40000.0,
            burn_max_temp_c: 80,
        }
    }
}

fn issue(
    check: GpuCheckKind,
    device: impl Into<String>,
    message: String,
    severity: Severity,
) -> GpuIssue {
    GpuIssue {
        check,
        device: device.into(),
        message,
        severity,
    }
}

/// Volatile counters fail the GPU; aggregate-only counts warn.
pub fn ecc_issues(counters: &[EccCounters]) -> Vec<GpuIssue> {
    let mut issues = Vec::new();
    for gpu in counters {
        let checks = [
            ("Volatile SRAM Uncorrectable", gpu.volatile_sram, Severity::Failed),
            ("Volatile DRAM Uncorrectable", gpu.volatile_dram, Severity::Failed),
            ("Aggregate SRAM Uncorrectable", gpu.aggregate_sram, Severity::Warning),
            ("Aggregate DRAM Uncorrectable", gpu.aggregate_dram, Severity::Warning),
        ];
        for (label, count, severity) in checks {
            if count > 0 {
                issues.push(issue(
                    GpuCheckKind::Ecc,
                    &gpu.gpu,
                    format!("{}: {}", label, count),
                    severity,
                ));
            }
        }
    }
    issues
}

pub fn remap_issues(rows: &[RemapCounts], thresholds: &GpuThresholds) -> Vec<GpuIssue> {
    let limit = thresholds.remap_uncorrectable_limit;
    let mut issues = Vec::new();
    for row in rows {
        let device = format!("GPU {}", row.gpu);
        if row.pending > 0 {
            issues.push(issue(
                GpuCheckKind::RowRemap,
                &device,
                format!("Row Remap Pending: {}", row.pending),
                Severity::Failed,
            ));
        }
        if row.failure > 0 {
            // informational only; nvidia-smi reports it alongside pending
            debug!(gpu = row.gpu, failure = row.failure, "row remap failure count");
        }
        if row.uncorrectable > limit {
            issues.push(issue(
                GpuCheckKind::RowRemap,
                &device,
                format!("Row Remap Uncorrectable >{}: {}", limit, row.uncorrectable),
                Severity::Failed,
            ));
        } else if row.uncorrectable > 0 {
            issues.push(issue(
                GpuCheckKind::RowRemap,
                &device,
                format!("Row Remap Uncorrectable <{}: {}", limit, row.uncorrectable),
                Severity::Warning,
            ));
        }
    }
    issues
}

pub fn xid_issues(events: &[XidEvent]) -> Vec<GpuIssue> {
    events
        .iter()
        .map(|event| {
            let severity = match event.severity {
                XidSeverity::Critical => Severity::Failed,
                XidSeverity::Warn => Severity::Warning,
            };
            issue(
                GpuCheckKind::Xid,
                &event.pci,
                format!("Xid {} x{}: {}", event.code, event.count, event.description),
                severity,
            )
        })
        .collect()
}

pub fn throttle_issues(samples: &[ThrottleSample]) -> Vec<GpuIssue> {
    samples
        .iter()
        .filter(|s| s.mask & !BENIGN_CLOCK_EVENTS != 0)
        .map(|s| {
            let active: Vec<&str> = s
                .reasons
                .iter()
                .map(String::as_str)
                .filter(|r| *r != "GPU_IDLE" && *r != "SW_POWER_CAP")
                .collect();
            let detail = if active.is_empty() {
                format!("{:#x}", s.mask)
            } else {
                active.join(", ")
            };
            issue(
                GpuCheckKind::Throttle,
                format!("GPU {}", s.gpu),
                format!("Clock event reasons: {}", detail),
                Severity::Warning,
            )
        })
        .collect()
}

/// Sets each record's status and returns the failures.
pub fn bandwidth_issues(
    records: &mut [BandwidthRecord],
    thresholds: &GpuThresholds,
) -> Vec<GpuIssue> {
    let mut issues = Vec::new();
    for record in records.iter_mut() {
        let device = format!("GPU {}", record.gpu);
        let directions = [
            ("Host to Device", record.htod_mean(), thresholds.htod_min_gbps),
            ("Device to Host", record.dtoh_mean(), thresholds.dtoh_min_gbps),
        ];
        let mut status = Status::Passed;
        for (label, mean, min) in directions {
            let message = if mean == MISSING_F64 {
                format!("{} bandwidth test produced no samples", label)
            } else if mean < min {
                format!("{} bandwidth {:.1} GB/s < {}", label, mean, min)
            } else {
                continue;
            };
            status = Status::failed(message.clone());
            issues.push(issue(GpuCheckKind::Bandwidth, &device, message, Severity::Failed));
        }
        record.status = status;
    }
    issues
}

/// Sets each record's status and returns the failures. Every breached
/// limit is reported; the record keeps the last one.
pub fn burn_issues(records: &mut [BurnRecord], thresholds: &GpuThresholds) -> Vec<GpuIssue> {
    let mut issues = Vec::new();
    for record in records.iter_mut() {
        let mut messages = Vec::new();
        if !record.has_samples() {
            messages.push("gpu_burn produced no progress samples".to_string());
        } else if record.max_gflops < thresholds.burn_min_gflops {
            messages.push(format!(
                "GFlops {:.0} < {}",
                record.max_gflops, thresholds.burn_min_gflops
            ));
        }
        if record.max_temp_c > thresholds.burn_max_temp_c {
            messages.push(format!("Temp {} C > {}", record.max_temp_c, thresholds.burn_max_temp_c));
        }
        if record.faulty || record.errors > 0 {
            messages.push(format!("gpu_burn reported FAULTY ({} errors)", record.errors.max(0)));
        }

        record.status = match messages.last() {
            Some(message) => Status::failed(message.clone()),
            None => Status::Passed,
        };
        let device = format!("GPU {}", record.gpu);
        issues.extend(
            messages
                .into_iter()
                .map(|message| issue(GpuCheckKind::Burn, &device, message, Severity::Failed)),
        );
    }
    issues
}

/// Issue raised when a stress test is skipped because GPUs are in use.
pub fn busy_issue(check: GpuCheckKind) -> GpuIssue {
    issue(
        check,
        "all",
        format!("{} test did not run: GPUs have running processes", check),
        Severity::Failed,
    )
}

/// Host verdict from its issues: most severe issue decides.
pub fn overall_status(issues: &[GpuIssue]) -> Status {
    let failed = issues.iter().filter(|i| i.severity == Severity::Failed).count();
    let warnings = issues.iter().filter(|i| i.severity == Severity::Warning).count();
    if failed > 0 {
        Status::failed(format!("{} GPU issue(s)", failed))
    } else if warnings > 0 {
        Status::warning(format!("{} GPU warning(s)", warnings))
    } else {
        Status::Passed
    }
}
