use super::Table;
use nodehealth_types::{Ipv6Fields, LatencyRecord, MappingRecord, RttccRecord, Severity};

pub fn rttcc_table(records: &[RttccRecord], color: bool) -> Table {
    let mut table = Table::new(&["interface", "enabled", "status"], color);
    for record in records {
        let enabled = match record.enabled {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        };
        table.status_row(
            vec![record.interface.clone(), enabled.to_string()],
            &record.status,
        );
    }
    table
}

pub fn mapping_table(records: &[MappingRecord], color: bool) -> Table {
    let mut table = Table::new(&["pci", "observed", "expected", "status"], color);
    for record in records {
        table.status_row(
            vec![
                record.pci.clone(),
                record.observed.clone(),
                record.expected.join("/"),
            ],
            &record.status,
        );
    }
    table
}

pub fn latency_table(records: &[LatencyRecord], color: bool) -> Table {
    let mut table = Table::new(
        &["client", "client_if", "server", "server_if", "latency_us", "status"],
        color,
    );
    for record in records {
        let latency = if record.latency_us < 0.0 {
            "-".to_string()
        } else {
            format!("{:.2}", record.latency_us)
        };
        table.status_row(
            vec![
                record.client.clone(),
                record.client_interface.clone(),
                record.server.clone(),
                record.server_interface.clone(),
                latency,
            ],
            &record.status,
        );
    }
    table
}

/// Decoded addresses; unparseable input is shown as a failed row.
pub fn ipv6_table(decoded: &[(String, Result<Ipv6Fields, String>)], color: bool) -> Table {
    let mut table = Table::new(
        &["address", "cluster_id", "tor_id", "isolation_id", "interface_id", "status"],
        color,
    );
    for (address, fields) in decoded {
        match fields {
            Ok(f) => table.row(
                vec![
                    address.clone(),
                    f.cluster_id.to_string(),
                    f.tor_id.to_string(),
                    f.isolation_id.to_string(),
                    f.interface_id.to_string(),
                ],
                Severity::Passed,
                "Passed",
            ),
            Err(err) => table.row(
                vec![address.clone(), "-".into(), "-".into(), "-".into(), "-".into()],
                Severity::Failed,
                format!("Failed - {}", err),
            ),
        }
    }
    table
}
