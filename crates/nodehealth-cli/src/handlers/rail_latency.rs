use super::emit;
use crate::context::ExecutionContext;
use crate::views::latency_table;
use anyhow::Result;
use nodehealth_providers::Shape;
use nodehealth_runtime::fabric::rail_latency;
use nodehealth_runtime::report::write_json;
use serde_json::json;

/// Returns whether any rail pair exceeded the cutoff or produced no result.
pub fn handle(
    ctx: &ExecutionContext,
    shape: Shape,
    client: &str,
    server: &str,
) -> Result<bool> {
    let records = ctx.block_on(rail_latency(
        &ctx.runner,
        &ctx.config.fabric,
        shape,
        client,
        server,
    ))??;

    let path = ctx.output_dir().join(format!(
        "rail_latency_{}_{}_{}.json",
        client,
        server,
        ctx.stamp(None)
    ));
    write_json(&path, &records)?;

    let failed = records.iter().filter(|r| r.status.is_failed()).count();
    let footer = format!(
        "{} pair(s), {} over {}us\nReport: {}",
        records.len(),
        failed,
        ctx.config.fabric.latency_cutoff_us,
        path.display()
    );
    emit(
        ctx,
        &latency_table(&records, ctx.color()),
        &json!({ "report": path, "records": records }),
        Some(footer),
    )?;
    Ok(failed > 0)
}
