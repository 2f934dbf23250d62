//! `nvidia-smi` query parsers: ECC counters, row remaps, clock event
//! reasons, running processes and GPU count.

use crate::value::parse_i64;
use nodehealth_core::CommandSpec;
use nodehealth_types::{EccCounters, RemapCounts, ThrottleSample};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static GPU_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GPU\s+([0-9A-Fa-f]+:[0-9A-Fa-f]+:[0-9A-Fa-f.]+)\s*$").unwrap());
static COUNTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*((?:SRAM|DRAM) Uncorrectable[\w -]*?)\s*:\s*(\S+)").unwrap());

pub fn ecc_command() -> CommandSpec {
    CommandSpec::new("nvidia-smi").arg("-q")
}

pub fn remap_command() -> CommandSpec {
    CommandSpec::new("nvidia-smi").args([
        "--query-remapped-rows=remapped_rows.pending,remapped_rows.failure,remapped_rows.uncorrectable",
        "--format=csv,noheader",
    ])
}

pub fn throttle_command() -> CommandSpec {
    CommandSpec::new("nvidia-smi").args([
        "--query-gpu=clocks_event_reasons.active",
        "--format=csv,noheader,nounits",
    ])
}

pub fn processes_command() -> CommandSpec {
    CommandSpec::new("nvidia-smi").args(["-q", "-d", "PIDS"])
}

pub fn list_command() -> CommandSpec {
    CommandSpec::new("nvidia-smi").arg("-L")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EccSection {
    None,
    Volatile,
    Aggregate,
}

/// Uncorrectable ECC counters per GPU from `nvidia-smi -q`.
///
/// Within each GPU block the first counter group is volatile and the second
/// aggregate. Drivers that split SRAM into `Parity` and `SEC-DED` rows are
/// summed; a plain `SRAM Uncorrectable` row takes precedence.
pub fn parse_ecc(output: &str) -> Vec<EccCounters> {
    let mut gpus: Vec<EccCounters> = Vec::new();
    let mut section = EccSection::None;
    let mut plain_sram_seen = false;

    for line in output.lines() {
        if let Some(caps) = GPU_HEADER.captures(line) {
            gpus.push(EccCounters {
                gpu: caps[1].to_string(),
                ..EccCounters::default()
            });
            section = EccSection::None;
            continue;
        }

        match line.trim() {
            "Volatile" => {
                section = EccSection::Volatile;
                plain_sram_seen = false;
                continue;
            }
            "Aggregate" => {
                section = EccSection::Aggregate;
                plain_sram_seen = false;
                continue;
            }
            _ => {}
        }

        let (Some(gpu), Some(caps)) = (gpus.last_mut(), COUNTER_LINE.captures(line)) else {
            continue;
        };
        if section == EccSection::None {
            continue;
        }

        let label = caps[1].trim();
        let count = parse_i64(&caps[2]).unwrap_or(0).max(0) as u64;
        let (sram, dram) = match section {
            EccSection::Volatile => (&mut gpu.volatile_sram, &mut gpu.volatile_dram),
            EccSection::Aggregate => (&mut gpu.aggregate_sram, &mut gpu.aggregate_dram),
            EccSection::None => continue,
        };

        match label {
            "SRAM Uncorrectable" => {
                *sram = count;
                plain_sram_seen = true;
            }
            "SRAM Uncorrectable Parity" | "SRAM Uncorrectable SEC-DED" if !plain_sram_seen => {
                *sram += count;
            }
            "DRAM Uncorrectable" => *dram = count,
            _ => {}
        }
    }

    gpus
}

/// Row-remap counters, one CSV line per GPU in index order.
pub fn parse_remapped_rows(output: &str) -> Vec<RemapCounts> {
    let mut rows = Vec::new();
    for (gpu, line) in output.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let fields: Vec<Option<i64>> = line.split(',').map(parse_i64).collect();
        match fields.as_slice() {
            [pending, failure, uncorrectable] => rows.push(RemapCounts {
                gpu,
                pending: pending.unwrap_or(0).max(0) as u64,
                failure: failure.unwrap_or(0).max(0) as u64,
                uncorrectable: uncorrectable.unwrap_or(0).max(0) as u64,
            }),
            _ => warn!(gpu, line, "unexpected remapped rows line"),
        }
    }
    rows
}

/// NVML clock event reason bits.
pub const CLOCK_EVENT_REASONS: &[(u64, &str)] = &[
    (0x1, "GPU_IDLE"),
    (0x2, "APPLICATIONS_CLOCKS_SETTING"),
    (0x4, "SW_POWER_CAP"),
    (0x8, "HW_SLOWDOWN"),
    (0x10, "SYNC_BOOST"),
    (0x20, "SW_THERMAL_SLOWDOWN"),
    (0x40, "HW_THERMAL_SLOWDOWN"),
    (0x80, "HW_POWER_BRAKE_SLOWDOWN"),
    (0x100, "DISPLAY_CLOCK_SETTING"),
];

pub fn decode_clock_reasons(mask: u64) -> Vec<String> {
    CLOCK_EVENT_REASONS
        .iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Active clock event bitmasks, one line per GPU (`0x0000000000000004`).
pub fn parse_throttle(output: &str) -> Vec<ThrottleSample> {
    let mut samples = Vec::new();
    for (gpu, line) in output.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let raw = line.trim();
        let parsed = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .map(|hex| u64::from_str_radix(hex, 16));
        match parsed {
            Some(Ok(mask)) => samples.push(ThrottleSample {
                gpu,
                mask,
                reasons: decode_clock_reasons(mask),
            }),
            _ => warn!(gpu, value = raw, "unreadable clock event reasons"),
        }
    }
    samples
}

/// True when `nvidia-smi -q -d PIDS` lists any compute process.
pub fn has_running_processes(output: &str) -> bool {
    output.lines().any(|l| l.trim_start().starts_with("Process ID"))
}

pub fn parse_gpu_count(output: &str) -> usize {
    output
        .lines()
        .filter(|l| l.trim_start().starts_with("GPU "))
        .count()
}
