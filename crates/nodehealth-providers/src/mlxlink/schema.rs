use serde::Deserialize;
use serde_json::Value;

pub(crate) const OPERATIONAL_INFO: &str = "Operational Info";
pub(crate) const TROUBLESHOOTING_INFO: &str = "Troubleshooting Info";
pub(crate) const TOOL_INFO: &str = "Tool Information";
pub(crate) const MODULE_INFO: &str = "Module Info";
pub(crate) const COUNTERS: &str = "Physical Counters and BER Info";
pub(crate) const FEC_HISTOGRAM: &str = "Histogram of FEC Errors";

pub(crate) const STATE: &str = "State";
pub(crate) const RECOMMENDATION: &str = "Recommendation";
pub(crate) const FIRMWARE_VERSION: &str = "Firmware Version";
pub(crate) const VENDOR_NAME: &str = "Vendor Name";
pub(crate) const VENDOR_SERIAL: &str = "Vendor Serial Number";
pub(crate) const RAW_BER: &str = "Raw Physical BER";
pub(crate) const EFF_BER: &str = "Effective Physical BER";
pub(crate) const EFF_ERRORS: &str = "Effective Physical Errors";
pub(crate) const RAW_ERRORS_PER_LANE: &str = "Raw Physical Errors Per Lane";

/// Tool message for ports whose firmware cannot produce the FEC histogram.
pub const FEC_UNSUPPORTED: &str = "FEC Histogram is not supported";

/// Tool message for a device name that does not exist on this host.
pub const NO_SUCH_DEVICE: &str = "No such file or directory";

/// Healthy recommendation text.
pub const NO_ISSUE: &str = "No issue was observed";

/// Top-level `--json` envelope.
#[derive(Debug, Deserialize, Default)]
pub(crate) struct MlxlinkDocument {
    #[serde(default)]
    pub status: Option<MlxlinkStatus>,
    #[serde(default)]
    pub result: Option<MlxlinkResult>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct MlxlinkStatus {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct MlxlinkResult {
    /// Sections keyed by their human-readable titles.
    #[serde(default)]
    pub output: Option<Value>,
}

/// Key of histogram bin `n` inside the FEC section.
pub(crate) fn bin_label(n: usize) -> String {
    format!("Bin {}", n)
}
