//! Report files: link CSV/JSON in a fixed column schema, diff files, and
//! JSON dumps for the other checks.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use nodehealth_engine::FailureDiff;
use nodehealth_types::{
    FEC_BIN_COUNT, LANE_COUNT, LinkRecord, MISSING, MISSING_F64, Status, UNKNOWN,
};
use serde::Serialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Csv,
        }
    }
}

pub fn datestamp(now: NaiveDateTime) -> String {
    now.format(STAMP_FORMAT).to_string()
}

/// `mlxlink_info_<target>_<stamp>.<ext>`
pub fn link_report_name(target: &str, stamp: &str, format: ReportFormat) -> String {
    format!("mlxlink_info_{}_{}.{}", target, stamp, format.extension())
}

pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = [
        "hostname",
        "host_serial",
        "ip_addr",
        "interface",
        "link_state",
        "firmware_version",
        "vendor_name",
        "cable_serial",
        "raw_phy_ber",
        "eff_phy_ber",
        "eff_phy_errs",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    columns.extend((0..LANE_COUNT).map(|lane| format!("raw_errors_lane{}", lane)));
    columns.extend((0..FEC_BIN_COUNT).map(|bin| format!("fec_bin{}", bin)));
    columns.extend(
        [
            "fec_histogram_supported",
            "recommendation",
            "flap_count",
            "last_flap_time",
            "status",
        ]
        .iter()
        .map(|c| c.to_string()),
    );
    columns
}

fn ber(value: f64) -> String {
    if value == MISSING_F64 {
        MISSING.to_string()
    } else {
        format!("{:e}", value)
    }
}

fn row(record: &LinkRecord) -> Vec<String> {
    let mut fields = vec![
        record.hostname.clone(),
        record.host_serial.clone(),
        record.ip_addr.clone().unwrap_or_default(),
        record.interface.clone(),
        record.link_state.clone(),
        record.firmware_version.clone(),
        record.vendor_name.clone(),
        record.cable_serial.clone(),
        ber(record.raw_phy_ber),
        ber(record.eff_phy_ber),
        record.eff_phy_errs.to_string(),
    ];
    fields.extend(record.raw_errors_per_lane.iter().map(|v| v.to_string()));
    fields.extend(record.fec_bins.bins().iter().map(|v| v.to_string()));
    fields.push(record.fec_histogram_supported.to_string());
    fields.push(record.recommendation.clone());
    fields.push(record.flap_count.to_string());
    fields.push(
        record
            .last_flap_time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default(),
    );
    fields.push(record.status.to_string());
    fields
}

pub fn write_link_csv<W: Write>(writer: W, records: &[LinkRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header())?;
    for record in records {
        csv.write_record(row(record))?;
    }
    csv.flush()?;
    Ok(())
}

/// Column lookup tolerant of the older CamelCase report layout.
struct Columns {
    names: Vec<String>,
}

impl Columns {
    fn position(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.names.iter().position(|n| n == alias))
    }
}

fn text_at(row: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_row(columns: &Columns, row: &csv::StringRecord, line: usize) -> Result<LinkRecord> {
    let get = |aliases: &[&str]| text_at(row, columns.position(aliases));

    let hostname = get(&["hostname"])
        .ok_or_else(|| Error::InvalidInput(format!("row {} has no hostname", line)))?;
    let interface = get(&["interface", "mlx5_"])
        .map(|i| {
            if i.chars().all(|c| c.is_ascii_digit()) {
                format!("mlx5_{}", i)
            } else {
                i.to_string()
            }
        })
        .ok_or_else(|| Error::InvalidInput(format!("row {} has no interface", line)))?;
    let serial = get(&["host_serial", "HostSerial"]).unwrap_or(UNKNOWN);

    let mut record = LinkRecord::sentinel(hostname, serial, interface);
    record.ip_addr = get(&["ip_addr"]).map(str::to_string);

    let text = |aliases: &[&str]| get(aliases).unwrap_or(UNKNOWN).to_string();
    record.link_state = text(&["link_state", "LinkState"]);
    record.firmware_version = text(&["firmware_version", "FW"]);
    record.vendor_name = text(&["vendor_name", "VendorName"]);
    record.cable_serial = text(&["cable_serial", "CableSerial"]);
    record.recommendation = text(&["recommendation", "Recommended"]);

    let float = |aliases: &[&str]| get(aliases).and_then(|v| v.parse().ok()).unwrap_or(MISSING_F64);
    let int = |aliases: &[&str]| {
        get(aliases)
            // older reports wrote single-element lists: "[0]"
            .map(|v| v.trim_matches(|c| c == '[' || c == ']'))
            .and_then(|v| v.parse().ok())
            .unwrap_or(MISSING)
    };
    record.raw_phy_ber = float(&["raw_phy_ber", "RawPhyBER"]);
    record.eff_phy_ber = float(&["eff_phy_ber", "EffPhyBER"]);
    record.eff_phy_errs = int(&["eff_phy_errs", "EffPhyErrs"]);

    for lane in 0..LANE_COUNT {
        record.raw_errors_per_lane[lane] = int(&[format!("raw_errors_lane{}", lane).as_str()]);
    }
    for bin in 0..FEC_BIN_COUNT {
        let snake = format!("fec_bin{}", bin);
        let camel = format!("FecBin{}", bin);
        record.fec_bins.set(bin, int(&[snake.as_str(), camel.as_str()]));
    }

    record.fec_histogram_supported = get(&["fec_histogram_supported"])
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    record.flap_count = get(&["flap_count"]).and_then(|v| v.parse().ok()).unwrap_or(0);
    record.last_flap_time = get(&["last_flap_time"])
        .and_then(|v| NaiveDateTime::parse_from_str(v, TIME_FORMAT).ok());
    record.status = match get(&["status", "Status"]) {
        Some(s) => s.parse().unwrap_or_else(|_| Status::warning(s)),
        None => Status::Passed,
    };
    Ok(record)
}

pub fn read_link_csv<R: Read>(reader: R) -> Result<Vec<LinkRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    let columns = Columns {
        names: csv.headers()?.iter().map(|h| h.trim().to_string()).collect(),
    };
    let mut records = Vec::new();
    for (i, row) in csv.records().enumerate() {
        records.push(parse_row(&columns, &row?, i + 2)?);
    }
    Ok(records)
}

/// Read a link report written by any earlier run, CSV or JSON by extension.
pub fn read_link_report(path: &Path) -> Result<Vec<LinkRecord>> {
    let file = fs::File::open(path)?;
    let records: Vec<LinkRecord> = match ReportFormat::from_path(path) {
        ReportFormat::Json => serde_json::from_reader(std::io::BufReader::new(file))?,
        ReportFormat::Csv => read_link_csv(file)?,
    };
    debug!(path = %path.display(), records = records.len(), "read link report");
    Ok(records)
}

pub fn write_link_report(path: &Path, records: &[LinkRecord]) -> Result<()> {
    ensure_parent(path)?;
    let file = fs::File::create(path)?;
    match ReportFormat::from_path(path) {
        ReportFormat::Json => serde_json::to_writer_pretty(file, records)?,
        ReportFormat::Csv => write_link_csv(file, records)?,
    }
    info!(path = %path.display(), records = records.len(), "wrote link report");
    Ok(())
}

/// Write the run's link report into `dir` and return its path.
pub fn save_link_report(
    dir: &Path,
    target: &str,
    stamp: &str,
    format: ReportFormat,
    records: &[LinkRecord],
) -> Result<PathBuf> {
    let path = dir.join(link_report_name(target, stamp, format));
    write_link_report(&path, records)?;
    Ok(path)
}

/// Write `new_failures_<stamp>.csv` and `recovered_<stamp>.csv`.
pub fn save_diff(dir: &Path, stamp: &str, diff: &FailureDiff) -> Result<(PathBuf, PathBuf)> {
    let new_path = dir.join(format!("new_failures_{}.csv", stamp));
    let recovered_path = dir.join(format!("recovered_{}.csv", stamp));
    write_link_report(&new_path, &diff.newly_failed)?;
    write_link_report(&recovered_path, &diff.recovered)?;
    Ok((new_path, recovered_path))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
