//! Report-level assertions for CLI and runtime tests.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// `hostname:interface` -> status string from a link CSV report.
pub fn csv_statuses(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening report {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("report has no '{}' column", name))
    };
    let (host, iface, status) = (column("hostname")?, column("interface")?, column("status")?);

    let mut statuses = BTreeMap::new();
    for row in reader.records() {
        let row = row?;
        statuses.insert(
            format!("{}:{}", &row[host], &row[iface]),
            row[status].to_string(),
        );
    }
    Ok(statuses)
}

/// Same mapping from a JSON array of link records.
pub fn json_statuses(json: &Value) -> Result<BTreeMap<String, String>> {
    let records = json.as_array().context("expected a JSON array of link records")?;
    records
        .iter()
        .map(|r| -> Result<(String, String)> {
            let field = |name: &str| {
                r[name]
                    .as_str()
                    .map(str::to_string)
                    .with_context(|| format!("record missing '{}'", name))
            };
            Ok((
                format!("{}:{}", field("hostname")?, field("interface")?),
                field("status")?,
            ))
        })
        .collect()
}

pub fn assert_status(statuses: &BTreeMap<String, String>, key: &str, expected: &str) -> Result<()> {
    match statuses.get(key) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => anyhow::bail!("{}: expected '{}', got '{}'", key, expected, actual),
        None => anyhow::bail!("{} not present in report", key),
    }
}
