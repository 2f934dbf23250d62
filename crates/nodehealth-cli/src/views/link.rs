use super::Table;
use nodehealth_engine::RunSummary;
use nodehealth_types::{LinkRecord, MISSING_F64};

fn ber(value: f64) -> String {
    if value == MISSING_F64 {
        "-".to_string()
    } else {
        format!("{:e}", value)
    }
}

pub fn link_table(records: &[LinkRecord], color: bool) -> Table {
    let mut table = Table::new(
        &[
            "hostname",
            "interface",
            "link_state",
            "raw_phy_ber",
            "eff_phy_errs",
            "fec_tail",
            "flaps",
            "cable_serial",
            "status",
        ],
        color,
    );
    for record in records {
        let tail = record
            .fec_bins
            .highest_nonzero_bin()
            .map(|bin| format!("bin {}", bin))
            .unwrap_or_else(|| "-".to_string());
        table.status_row(
            vec![
                record.hostname.clone(),
                record.interface.clone(),
                record.link_state.clone(),
                ber(record.raw_phy_ber),
                record.eff_phy_errs.to_string(),
                tail,
                record.flap_count.to_string(),
                record.cable_serial.clone(),
            ],
            &record.status,
        );
    }
    table
}

pub fn summary_line(summary: &RunSummary) -> String {
    format!(
        "{} host(s), {} link(s): {} passed, {} warning(s), {} failed",
        summary.hosts, summary.links, summary.passed, summary.warnings, summary.failed
    )
}
