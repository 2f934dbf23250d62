use super::Table;
use nodehealth_types::GpuHealthReport;

/// One row per issue; a clean host gets a single passing row.
pub fn gpu_table(report: &GpuHealthReport, color: bool) -> Table {
    let mut table = Table::new(&["hostname", "check", "device", "status"], color);
    for issue in &report.issues {
        table.row(
            vec![
                report.hostname.clone(),
                issue.check.to_string(),
                issue.device.clone(),
            ],
            issue.severity,
            issue.message.clone(),
        );
    }
    for check in &report.skipped {
        table.row(
            vec![report.hostname.clone(), check.to_string(), "-".to_string()],
            nodehealth_types::Severity::Warning,
            "Skipped",
        );
    }
    if table.is_empty() {
        table.status_row(
            vec![report.hostname.clone(), "all".to_string(), "-".to_string()],
            &report.status,
        );
    }
    table
}
