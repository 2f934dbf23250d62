use super::emit;
use crate::context::ExecutionContext;
use crate::views::mapping_table;
use anyhow::Result;
use nodehealth_core::host::local_hostname;
use nodehealth_runtime::fabric::mapping;
use nodehealth_runtime::report::write_json;
use serde_json::json;
use tracing::warn;

/// Returns whether any PCI slot carries the wrong device name.
pub fn handle(ctx: &ExecutionContext) -> Result<bool> {
    let records = ctx.block_on(mapping(&ctx.runner))?;
    if records.is_empty() {
        warn!("no RDMA devices found by mst status or ibdev2netdev");
    }

    let path = ctx.output_dir().join(format!(
        "mapping_{}_{}.json",
        local_hostname(),
        ctx.stamp(None)
    ));
    write_json(&path, &records)?;

    let failed = records.iter().filter(|r| r.status.is_failed()).count();
    let footer = format!(
        "{} device(s), {} mismatched\nReport: {}",
        records.len(),
        failed,
        path.display()
    );
    emit(
        ctx,
        &mapping_table(&records, ctx.color()),
        &json!({ "report": path, "records": records }),
        Some(footer),
    )?;
    Ok(failed > 0)
}
