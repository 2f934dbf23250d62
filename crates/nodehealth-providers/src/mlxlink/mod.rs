//! `mlxlink` link diagnostics.
//!
//! `mlxlink -m -e -c -d <dev> --rx_fec_histogram --show_histogram --json`
//! is the primary source. When stdout is not JSON (older MFT releases, or a
//! run without `--json`), the label/value text layout is parsed instead.

mod mapper;
pub mod schema;
mod text;

pub use mapper::{LinkContext, normalize_link, normalize_link_json, read_saved_link};
pub use text::strip_ansi;

use nodehealth_core::CommandSpec;
use std::time::Duration;

/// Build the collection command for one RDMA device.
pub fn command(device: &str, timeout: Duration) -> CommandSpec {
    CommandSpec::new("mlxlink")
        .args(["-m", "-e", "-c", "-d", device])
        .args(["--rx_fec_histogram", "--show_histogram", "--json"])
        .timeout(timeout)
        .sudo()
}
