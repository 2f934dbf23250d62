use super::Table;
use nodehealth_types::{FleetStepResult, Severity, StepStatus};

pub fn fleet_table(steps: &[FleetStepResult], color: bool) -> Table {
    let mut table = Table::new(&["host", "step", "command", "status"], color);
    for step in steps {
        let (severity, verdict) = match step.status {
            StepStatus::Pass => (Severity::Passed, "Passed".to_string()),
            StepStatus::Fail => (Severity::Failed, format!("Failed - {}", step.output)),
        };
        table.row(
            vec![step.host.clone(), step.step.to_string(), step.command.clone()],
            severity,
            verdict,
        );
    }
    table
}
