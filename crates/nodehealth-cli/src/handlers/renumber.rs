use super::emit;
use crate::context::ExecutionContext;
use crate::views::Table;
use anyhow::Result;
use nodehealth_providers::Shape;
use nodehealth_providers::topology::standardize_interface;
use nodehealth_types::Severity;
use serde_json::json;

/// Returns whether any interface has no H100 counterpart.
pub fn handle(ctx: &ExecutionContext, shape: Shape, interfaces: &[String]) -> Result<bool> {
    let mut table = Table::new(&["shape", "interface", "h100"], ctx.color());
    let mut body = Vec::new();
    let mut unmapped = false;

    for interface in interfaces {
        let standard = standardize_interface(shape, interface);
        match &standard {
            Some(name) => table.row(
                vec![shape.to_string(), interface.clone()],
                Severity::Passed,
                name.clone(),
            ),
            None => {
                unmapped = true;
                table.row(
                    vec![shape.to_string(), interface.clone()],
                    Severity::Failed,
                    "no H100 slot",
                );
            }
        }
        body.push(json!({ "interface": interface, "h100": standard }));
    }

    emit(ctx, &table, &body, None)?;
    Ok(unmapped)
}
