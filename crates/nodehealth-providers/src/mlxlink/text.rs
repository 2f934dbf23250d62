use super::schema::{
    EFF_BER, EFF_ERRORS, FIRMWARE_VERSION, RAW_BER, RAW_ERRORS_PER_LANE, RECOMMENDATION, STATE,
    VENDOR_NAME, VENDOR_SERIAL,
};
use crate::value::{parse_f64, parse_i64};
use nodehealth_types::LinkRecord;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());
static LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^:\[]+?)\s*:\s*(.*?)\s*$").unwrap());
static BIN_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Bin\s+(\d+)\b.*?(\d+)\s*$").unwrap());

pub fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").trim().to_string()
}

/// First value seen for each `Label : value` line.
fn labels(text: &str) -> HashMap<&str, &str> {
    let mut map = HashMap::new();
    for line in text.lines() {
        if let Some(caps) = LABEL_LINE.captures(line)
            && let (Some(label), Some(value)) = (caps.get(1), caps.get(2))
        {
            map.entry(label.as_str()).or_insert(value.as_str());
        }
    }
    map
}

/// Fill `record` from mlxlink's human-readable layout.
pub(crate) fn apply(record: &mut LinkRecord, raw: &str) {
    let clean = ANSI_ESCAPE.replace_all(raw, "");
    let labels = labels(&clean);
    let text = |label: &str| {
        labels
            .get(label)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && *v != "N/A")
            .map(str::to_string)
    };

    if let Some(v) = text(STATE) {
        record.link_state = v;
    }
    if let Some(v) = text(FIRMWARE_VERSION) {
        record.firmware_version = v;
    }
    if let Some(v) = text(VENDOR_NAME) {
        record.vendor_name = v;
    }
    if let Some(v) = text(VENDOR_SERIAL) {
        record.cable_serial = v;
    }
    if let Some(v) = text(RECOMMENDATION) {
        record.recommendation = v;
    }
    if let Some(v) = text(RAW_BER).as_deref().and_then(parse_f64) {
        record.raw_phy_ber = v;
    }
    if let Some(v) = text(EFF_BER).as_deref().and_then(parse_f64) {
        record.eff_phy_ber = v;
    }
    if let Some(v) = text(EFF_ERRORS).as_deref().and_then(parse_i64) {
        record.eff_phy_errs = v;
    }
    if let Some(lanes) = text(RAW_ERRORS_PER_LANE) {
        let counts = lanes
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(parse_i64);
        for (slot, count) in record.raw_errors_per_lane.iter_mut().zip(counts) {
            if let Some(count) = count {
                *slot = count;
            }
        }
    }

    for line in clean.lines() {
        if let Some(caps) = BIN_LINE.captures(line)
            && let (Some(bin), Some(count)) = (
                caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()),
                caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok()),
            )
        {
            record.fec_bins.set(bin, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Operational Info
----------------
State                              : Active
Physical state                     : LinkUp

Troubleshooting Info
--------------------
Status Opcode                      : 0
Recommendation                     : \x1b[33mBad signal integrity\x1b[0m

Module Info
-----------
Vendor Name                        : NVIDIA
Vendor Serial Number               : MT2330FT0999

Physical Counters and BER Info
------------------------------
Time Since Last Clear [Min]        : 1440.2
Effective Physical Errors          : 12
Effective Physical BER             : 3E-13
Raw Physical Errors Per Lane       : 10,0,5,2
Raw Physical BER                   : 4E-8

Histogram of FEC Errors
-----------------------
Bin 0      : [0:0]      1000
Bin 7      : [7:7]      4
Bin 15     : [15:15]    0
";

    #[test]
    fn test_text_layout() {
        let mut record = LinkRecord::sentinel("h", "s", "mlx5_0");
        apply(&mut record, SAMPLE);
        assert_eq!(record.link_state, "Active");
        assert_eq!(record.recommendation, "Bad signal integrity");
        assert_eq!(record.cable_serial, "MT2330FT0999");
        assert_eq!(record.eff_phy_errs, 12);
        assert_eq!(record.raw_phy_ber, 4e-8);
        assert_eq!(record.raw_errors_per_lane, [10, 0, 5, 2]);
        assert_eq!(record.fec_bins.get(0), 1000);
        assert_eq!(record.fec_bins.get(7), 4);
        assert_eq!(record.fec_bins.get(15), 0);
        assert_eq!(record.fec_bins.get(3), -1);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mNo issue was observed\x1b[0m "), "No issue was observed");
    }
}
