use super::schema::{
    COUNTERS, EFF_BER, EFF_ERRORS, FEC_HISTOGRAM, FEC_UNSUPPORTED, FIRMWARE_VERSION, MODULE_INFO,
    MlxlinkDocument, NO_SUCH_DEVICE, OPERATIONAL_INFO, RAW_BER, RAW_ERRORS_PER_LANE,
    RECOMMENDATION, STATE, TOOL_INFO, TROUBLESHOOTING_INFO, VENDOR_NAME, VENDOR_SERIAL, bin_label,
};
use super::text;
use crate::error::Result;
use crate::value::{as_f64, as_i64, as_text, field, values_at};
use nodehealth_core::CommandOutput;
use nodehealth_types::{FEC_BIN_COUNT, LinkRecord};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Identity stamped onto every record produced for one interface.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub hostname: &'a str,
    pub host_serial: &'a str,
    pub interface: &'a str,
}

impl LinkContext<'_> {
    fn sentinel(&self) -> LinkRecord {
        LinkRecord::sentinel(self.hostname, self.host_serial, self.interface)
    }
}

/// Normalize one mlxlink invocation. Always returns a record.
pub fn normalize_link(output: &CommandOutput, ctx: &LinkContext<'_>) -> LinkRecord {
    if output.timed_out || output.not_found {
        warn!(
            interface = ctx.interface,
            reason = %output.failure_reason().unwrap_or_default(),
            "mlxlink did not complete; recording sentinels"
        );
        return ctx.sentinel();
    }

    if output.stderr.contains(NO_SUCH_DEVICE) {
        warn!(interface = ctx.interface, "device does not exist on this host");
        return ctx.sentinel();
    }

    let stdout = output.stdout.trim();
    if stdout.is_empty() {
        warn!(
            interface = ctx.interface,
            reason = %output.failure_reason().unwrap_or_default(),
            "mlxlink produced no output"
        );
        return ctx.sentinel();
    }

    let mut record = match serde_json::from_str::<Value>(stdout) {
        Ok(doc) => normalize_link_json(&doc, ctx),
        Err(err) => {
            debug!(interface = ctx.interface, error = %err, "output is not JSON, parsing text");
            let mut record = ctx.sentinel();
            text::apply(&mut record, stdout);
            record
        }
    };

    if output.stderr.contains(FEC_UNSUPPORTED) || stdout.contains(FEC_UNSUPPORTED) {
        record.fec_histogram_supported = false;
    }
    record
}

/// Normalize an already parsed mlxlink JSON document.
pub fn normalize_link_json(doc: &Value, ctx: &LinkContext<'_>) -> LinkRecord {
    let mut record = ctx.sentinel();

    let parsed = match MlxlinkDocument::deserialize(doc) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(interface = ctx.interface, error = %err, "unexpected mlxlink JSON layout");
            return record;
        }
    };

    if let Some(status) = &parsed.status
        && status.code != 0
    {
        if status.message.contains(NO_SUCH_DEVICE) {
            warn!(interface = ctx.interface, "device does not exist on this host");
            return record;
        }
        if status.message.contains(FEC_UNSUPPORTED) {
            record.fec_histogram_supported = false;
        } else {
            debug!(
                interface = ctx.interface,
                code = status.code,
                message = %status.message,
                "mlxlink reported a non-zero status"
            );
        }
    }

    if let Some(output) = parsed.result.and_then(|r| r.output) {
        apply_sections(&mut record, &output);
    }
    record
}

/// Normalize a previously saved `mlxlink --json` file.
pub fn read_saved_link(content: &str, ctx: &LinkContext<'_>) -> Result<LinkRecord> {
    let doc: Value = serde_json::from_str(content)?;
    let mut record = normalize_link_json(&doc, ctx);
    if content.contains(FEC_UNSUPPORTED) {
        record.fec_histogram_supported = false;
    }
    Ok(record)
}

fn apply_sections(record: &mut LinkRecord, out: &Value) {
    let text_at = |section: &str, label: &str| field(out, section, label).and_then(as_text);

    if let Some(state) = text_at(OPERATIONAL_INFO, STATE) {
        record.link_state = state;
    }
    if let Some(fw) = text_at(TOOL_INFO, FIRMWARE_VERSION) {
        record.firmware_version = fw;
    }
    if let Some(vendor) = text_at(MODULE_INFO, VENDOR_NAME) {
        record.vendor_name = vendor;
    }
    if let Some(serial) = text_at(MODULE_INFO, VENDOR_SERIAL) {
        record.cable_serial = serial;
    }
    if let Some(rec) = text_at(TROUBLESHOOTING_INFO, RECOMMENDATION) {
        record.recommendation = text::strip_ansi(&rec);
    }

    if let Some(ber) = field(out, COUNTERS, RAW_BER).and_then(as_f64) {
        record.raw_phy_ber = ber;
    }
    if let Some(ber) = field(out, COUNTERS, EFF_BER).and_then(as_f64) {
        record.eff_phy_ber = ber;
    }
    if let Some(errs) = field(out, COUNTERS, EFF_ERRORS).and_then(as_i64) {
        record.eff_phy_errs = errs;
    }

    if let Some(lanes) = field(out, COUNTERS, RAW_ERRORS_PER_LANE) {
        for (lane, slot) in record.raw_errors_per_lane.iter_mut().enumerate() {
            if let Some(count) = values_at(lanes, lane).and_then(as_i64) {
                *slot = count;
            }
        }
    }

    // Each bin is {"values": [range, count]}; generations report 8..16 bins.
    if let Some(hist) = out.get(FEC_HISTOGRAM) {
        for bin in 0..FEC_BIN_COUNT {
            if let Some(count) = hist
                .get(bin_label(bin))
                .and_then(|b| values_at(b, 1))
                .and_then(as_i64)
            {
                record.fec_bins.set(bin, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodehealth_types::{MISSING, UNKNOWN};
    use serde_json::json;

    const CTX: LinkContext<'static> = LinkContext {
        hostname: "gpu-7",
        host_serial: "2333XLG0AB",
        interface: "mlx5_3",
    };

    fn healthy_doc() -> Value {
        json!({
            "result": {
                "output": {
                    "Operational Info": { "State": "Active", "Physical state": "LinkUp" },
                    "Troubleshooting Info": { "Recommendation": "\u{1b}[32mNo issue was observed\u{1b}[0m" },
                    "Tool Information": { "Firmware Version": "28.39.2048" },
                    "Module Info": { "Vendor Name": "NVIDIA", "Vendor Serial Number": "MT2330FT0123" },
                    "Physical Counters and BER Info": {
                        "Effective Physical Errors": "0",
                        "Effective Physical BER": "15E-255",
                        "Raw Physical BER": "1.5E-11",
                        "Raw Physical Errors Per Lane": { "values": ["120", "33", "7", "0"] }
                    },
                    "Histogram of FEC Errors": {
                        "Header": { "values": ["Range", "Counter"] },
                        "Bin 0": { "values": ["[0:0]", "98765"] },
                        "Bin 1": { "values": ["[1:1]", "120"] },
                        "Bin 7": { "values": ["[7:7]", "0"] }
                    }
                }
            },
            "status": { "code": 0, "message": "Success" }
        })
    }

    #[test]
    fn test_normalize_healthy_json() {
        let record = normalize_link_json(&healthy_doc(), &CTX);
        assert_eq!(record.link_state, "Active");
        assert_eq!(record.firmware_version, "28.39.2048");
        assert_eq!(record.cable_serial, "MT2330FT0123");
        assert_eq!(record.recommendation, "No issue was observed");
        assert_eq!(record.raw_phy_ber, 1.5e-11);
        assert_eq!(record.eff_phy_errs, 0);
        assert_eq!(record.raw_errors_per_lane, [120, 33, 7, 0]);
        assert_eq!(record.fec_bins.get(0), 98765);
        assert_eq!(record.fec_bins.get(7), 0);
        assert_eq!(record.fec_bins.get(15), MISSING);
        assert!(record.fec_histogram_supported);
    }

    #[test]
    fn test_missing_sections_become_sentinels() {
        let doc = json!({ "result": { "output": { "Operational Info": { "State": "Down" } } } });
        let record = normalize_link_json(&doc, &CTX);
        assert_eq!(record.link_state, "Down");
        assert_eq!(record.vendor_name, UNKNOWN);
        assert_eq!(record.eff_phy_errs, MISSING);
        assert!(!record.fec_bins.is_reported());
    }

    #[test]
    fn test_unsupported_histogram_is_partial_success() {
        let mut doc = healthy_doc();
        doc["status"] = json!({ "code": 1, "message": "-E- FEC Histogram is not supported for the current device" });
        if let Some(out) = doc.pointer_mut("/result/output")
            && let Some(map) = out.as_object_mut()
        {
            map.remove(FEC_HISTOGRAM);
        }
        let record = normalize_link_json(&doc, &CTX);
        assert_eq!(record.link_state, "Active");
        assert!(!record.fec_histogram_supported);
    }

    #[test]
    fn test_missing_device_is_sentinel() {
        let doc = json!({ "status": { "code": 1, "message": "-E- Failed to open device: No such file or directory" } });
        let record = normalize_link_json(&doc, &CTX);
        assert_eq!(record.link_state, UNKNOWN);
        assert_eq!(record.interface, "mlx5_3");
    }

    #[test]
    fn test_timeout_yields_sentinel_record() {
        let record = normalize_link(&CommandOutput::timeout(), &CTX);
        assert_eq!(record.hostname, "gpu-7");
        assert_eq!(record.link_state, UNKNOWN);
        assert_eq!(record.raw_phy_ber, -1.0);
    }

    #[test]
    fn test_nonzero_exit_with_json_still_parsed() {
        let output = CommandOutput::completed(
            1,
            healthy_doc().to_string(),
            "-E- FEC Histogram is not supported",
        );
        let record = normalize_link(&output, &CTX);
        assert_eq!(record.link_state, "Active");
        assert!(!record.fec_histogram_supported);
    }

    #[test]
    fn test_text_fallback() {
        let stdout = "Operational Info\n----------------\nState                    : Active\n\
                      Physical Counters and BER Info\n------------------------------\n\
                      Raw Physical BER         : 2E-7\nEffective Physical Errors : 3\n";
        let record = normalize_link(&CommandOutput::completed(0, stdout, ""), &CTX);
        assert_eq!(record.link_state, "Active");
        assert_eq!(record.raw_phy_ber, 2e-7);
        assert_eq!(record.eff_phy_errs, 3);
    }

    #[test]
    fn test_read_saved_link() {
        let record = read_saved_link(&healthy_doc().to_string(), &CTX).unwrap();
        assert_eq!(record.fec_bins.get(1), 120);
        assert!(read_saved_link("{ truncated", &CTX).is_err());
    }
}
