use super::emit;
use crate::context::ExecutionContext;
use crate::views::gpu_table;
use anyhow::Result;
use nodehealth_core::host::collect_identity;
use nodehealth_runtime::GpuCheck;
use nodehealth_runtime::report::write_json;
use serde_json::json;

/// Returns whether the host's overall GPU status is Failed.
pub fn handle(ctx: &ExecutionContext, date_stamp: Option<String>) -> Result<bool> {
    let check = GpuCheck::new(&ctx.runner, &ctx.config.gpu);
    let report = ctx.block_on(async {
        let identity = collect_identity(&ctx.runner).await;
        check.run(&identity).await
    })?;

    let stamp = ctx.stamp(date_stamp);
    let path = ctx
        .output_dir()
        .join(format!("gpu_health_{}_{}.json", report.hostname, stamp));
    write_json(&path, &report)?;

    let table = gpu_table(&report, ctx.color());
    let footer = format!(
        "{}: {} ({} issue(s))\nReport: {}",
        report.hostname,
        report.status,
        report.issues.len(),
        path.display()
    );
    emit(ctx, &table, &json!({ "report": path, "health": report }), Some(footer))?;

    Ok(report.status.is_failed())
}
