mod fabric;
mod fleet;
mod gpu;
mod link;

pub use fabric::{ipv6_table, latency_table, mapping_table, rttcc_table};
pub use fleet::fleet_table;
pub use gpu::gpu_table;
pub use link::{link_table, summary_line};

use nodehealth_types::{Severity, Status};
use owo_colors::OwoColorize;
use std::fmt;
use std::io::Write;

struct Row {
    cells: Vec<String>,
    severity: Severity,
    verdict: String,
}

/// Column-aligned rows whose last column is a colored verdict.
pub struct Table {
    header: Vec<String>,
    rows: Vec<Row>,
    color: bool,
}

impl Table {
    /// `header` names every column, the verdict column included.
    pub fn new(header: &[&str], color: bool) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            color,
        }
    }

    pub fn row(&mut self, cells: Vec<String>, severity: Severity, verdict: impl Into<String>) {
        self.rows.push(Row {
            cells,
            severity,
            verdict: verdict.into(),
        });
    }

    pub fn status_row(&mut self, cells: Vec<String>, status: &Status) {
        self.row(cells, status.severity(), status.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let header: Vec<String> = self.header.iter().map(|h| csv_field(h)).collect();
        writeln!(out, "{}", header.join(","))?;
        for row in &self.rows {
            let fields: Vec<String> = row
                .cells
                .iter()
                .chain(std::iter::once(&row.verdict))
                .map(|c| csv_field(c))
                .collect();
            writeln!(out, "{}", fields.join(","))?;
        }
        Ok(())
    }

    fn widths(&self) -> Vec<usize> {
        let columns = self.header.len().saturating_sub(1);
        (0..columns)
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|r| r.cells.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(self.header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        let Some((last, leading)) = self.header.split_last() else {
            return Ok(());
        };

        let mut line = String::new();
        for (name, width) in leading.iter().zip(&widths) {
            line.push_str(&format!("{:<width$}  ", name, width = width));
        }
        line.push_str(last);
        if self.color {
            writeln!(f, "{}", line.bold())?;
        } else {
            writeln!(f, "{}", line)?;
        }

        for row in &self.rows {
            for (cell, width) in row.cells.iter().zip(&widths) {
                write!(f, "{:<width$}  ", cell, width = width)?;
            }
            writeln!(f, "{}", paint(&row.verdict, row.severity, self.color))?;
        }
        Ok(())
    }
}

pub fn paint(text: &str, severity: Severity, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match severity {
        Severity::Passed => format!("{}", text.green()),
        Severity::Warning => format!("{}", text.yellow()),
        Severity::Failed => format!("{}", text.red()),
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(&["interface", "state", "status"], false);
        table.status_row(vec!["mlx5_0".into(), "Active".into()], &Status::Passed);
        table.status_row(
            vec!["mlx5_10".into(), "Polling".into()],
            &Status::failed("LinkState = Polling"),
        );
        table
    }

    #[test]
    fn test_table_aligns_columns() {
        insta::assert_snapshot!(sample().to_string(), @r"
        interface  state    status
        mlx5_0     Active   Passed
        mlx5_10    Polling  Failed - LinkState = Polling
        ");
    }

    #[test]
    fn test_table_csv_quotes_commas() {
        let mut table = Table::new(&["device", "status"], false);
        table.row(
            vec!["GPU 1".into()],
            Severity::Warning,
            "Clock event reasons: HW_SLOWDOWN, SYNC_BOOST",
        );
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "device,status\nGPU 1,\"Clock event reasons: HW_SLOWDOWN, SYNC_BOOST\"\n"
        );
    }
}
