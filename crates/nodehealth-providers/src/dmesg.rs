//! Kernel log scanning: GPU Xid errors and NIC link transitions.

use chrono::NaiveDateTime;
use nodehealth_core::CommandSpec;
use nodehealth_types::XidSeverity::{Critical, Warn};
use nodehealth_types::{XidEvent, XidSeverity};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

static XID_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"NVRM: Xid \(PCI:([^)]*)\): (\d+),").unwrap());
static LINK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\w{3} \w{3} {1,2}\d{1,2} \d{2}:\d{2}:\d{2} \d{4})\].*\s(\S+): Link (\w+)")
        .unwrap()
});

const DMESG_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

pub fn command() -> CommandSpec {
    CommandSpec::new("dmesg").arg("-T").sudo()
}

/// Xid codes worth reporting, with their meaning and severity.
pub const XID_CATALOG: &[(u32, &str, XidSeverity)] = &[
    (48, "Double Bit ECC Error", Critical),
    (56, "Display Engine error", Critical),
    (57, "Error programming video memory interface", Critical),
    (58, "Unstable video memory interface detected", Critical),
    (62, "Internal micro-controller halt", Critical),
    (63, "ECC page retirement or row remapping recording event", Critical),
    (64, "ECC page retirement or row remapper recording failure", Critical),
    (65, "Video processor exception", Critical),
    (68, "NVDEC0 Exception", Critical),
    (69, "Graphics Engine class error", Critical),
    (73, "NVENC2 Error", Critical),
    (74, "NVLINK Error", Critical),
    (79, "GPU has fallen off the bus", Critical),
    (80, "Corrupted data sent to GPU", Critical),
    (81, "VGA Subsystem Error", Critical),
    (82, "NVJPGO Error", Warn),
    (83, "NVDEC1 Error", Warn),
    (84, "NVDEC2 Error", Warn),
    (86, "OFA Exception", Warn),
    (88, "NVDEC3 Error", Warn),
    (89, "NVDEC4 Error", Warn),
    (92, "High single-bit ECC error rate", Critical),
    (94, "Contained ECC error", Critical),
    (95, "Uncontained ECC error", Critical),
    (96, "NVDEC5 Error", Warn),
    (97, "NVDEC6 Error", Warn),
    (98, "NVDEC7 Error", Warn),
    (99, "NVJPG1 Error", Warn),
    (100, "NVJPG2 Error", Warn),
    (101, "NVJPG3 Error", Warn),
    (102, "NVJPG4 Error", Warn),
    (103, "NVJPG5 Error", Warn),
    (104, "NVJPG6 Error", Warn),
    (105, "NVJPG7 Error", Warn),
    (110, "Security Fault Error", Warn),
    (111, "Display Bundle Error Event", Warn),
    (112, "Display Supervisor Error", Warn),
    (113, "DP Link Training Error", Warn),
    (114, "Display Pipeline Underflow Error", Warn),
    (115, "Display Core Channel Error", Warn),
    (116, "Display Window Channel Error", Warn),
    (117, "Display Cursor Channel Error", Warn),
    (118, "Display Pixel Pipeline Error", Warn),
    (119, "GSP RPC Timeout", Critical),
    (120, "GSP Error", Critical),
    (122, "SPI PMU RPC Read Failure", Warn),
    (123, "SPI PMU RPC Write Failure", Warn),
    (124, "SPI PMU RPC Erase Failure", Warn),
    (125, "Inforom FS Failure", Warn),
];

pub fn lookup_xid(code: u32) -> Option<(&'static str, XidSeverity)> {
    XID_CATALOG
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, description, severity)| (*description, *severity))
}

/// Catalogued Xid occurrences grouped by (code, PCI address).
///
/// Critical codes come first; within a severity, ordered by code then PCI.
pub fn parse_xid(log: &str) -> Vec<XidEvent> {
    let mut counts: BTreeMap<(u32, String), usize> = BTreeMap::new();

    for caps in XID_LINE.captures_iter(log) {
        let Ok(code) = caps[2].parse::<u32>() else {
            continue;
        };
        if lookup_xid(code).is_none() {
            debug!(code, "ignoring uncatalogued Xid");
            continue;
        }
        *counts.entry((code, caps[1].trim().to_string())).or_default() += 1;
    }

    let mut events: Vec<XidEvent> = counts
        .into_iter()
        .filter_map(|((code, pci), count)| {
            let (description, severity) = lookup_xid(code)?;
            Some(XidEvent {
                code,
                pci,
                count,
                description: description.to_string(),
                severity,
            })
        })
        .collect();
    events.sort_by_key(|e| e.severity != XidSeverity::Critical);
    events
}

/// One `<netdev>: Link up|down` line from `dmesg -T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub time: NaiveDateTime,
    pub netdev: String,
    pub state: String,
}

impl LinkEvent {
    pub fn is_down(&self) -> bool {
        self.state.eq_ignore_ascii_case("down")
    }
}

pub fn parse_link_events(log: &str) -> Vec<LinkEvent> {
    log.lines()
        .filter_map(|line| {
            let caps = LINK_LINE.captures(line)?;
            let stamp = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
            let time = NaiveDateTime::parse_from_str(&stamp, DMESG_TIME_FORMAT).ok()?;
            Some(LinkEvent {
                time,
                netdev: caps[2].to_string(),
                state: caps[3].to_string(),
            })
        })
        .collect()
}
