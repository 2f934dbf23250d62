use super::emit;
use crate::context::ExecutionContext;
use crate::views::rttcc_table;
use anyhow::Result;
use nodehealth_core::host::local_hostname;
use nodehealth_runtime::LinkCheck;
use nodehealth_runtime::fabric::rttcc;
use nodehealth_runtime::report::write_json;
use serde_json::json;

/// Returns whether any device still has RTTCC enabled or could not be read.
pub fn handle(ctx: &ExecutionContext) -> Result<bool> {
    let link = &ctx.config.link;
    let records = ctx.block_on(async {
        let devices = LinkCheck::new(&ctx.runner, link).interfaces().await;
        rttcc(&ctx.runner, &ctx.config.fabric, &devices, link.concurrency).await
    })?;

    let path = ctx.output_dir().join(format!(
        "rttcc_{}_{}.json",
        local_hostname(),
        ctx.stamp(None)
    ));
    write_json(&path, &records)?;

    let failed = records.iter().filter(|r| r.status.is_failed()).count();
    let footer = format!(
        "{} device(s), {} failed\nReport: {}",
        records.len(),
        failed,
        path.display()
    );
    emit(
        ctx,
        &rttcc_table(&records, ctx.color()),
        &json!({ "report": path, "records": records }),
        Some(footer),
    )?;
    Ok(failed > 0)
}
