use crate::context::ExecutionContext;
use anyhow::Result;
use nodehealth_core::host::collect_identity;
use nodehealth_runtime::snapshot::{capture, write_snapshot};
use serde_json::json;

pub fn handle(ctx: &ExecutionContext) -> Result<()> {
    let config = &ctx.config.link;
    let snapshot = ctx.block_on(async {
        let identity = collect_identity(&ctx.runner).await;
        capture(&ctx.runner, config, &identity, ctx.now()).await
    })?;
    let path = write_snapshot(ctx.output_dir(), &snapshot)?;

    match ctx.format {
        crate::types::OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "snapshot": path,
                "interfaces": snapshot.mlxlink.len(),
            }))?
        ),
        _ => println!(
            "Captured {} interface(s) from {}: {}",
            snapshot.mlxlink.len(),
            snapshot.hostname,
            path.display()
        ),
    }
    Ok(())
}
