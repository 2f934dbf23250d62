use super::emit;
use crate::context::ExecutionContext;
use crate::views::link_table;
use anyhow::{Context, Result};
use nodehealth_engine::{diff_failures, failing_keys};
use nodehealth_runtime::report::{read_link_report, save_diff};
use serde_json::json;
use std::path::Path;

/// Returns whether anything newly failed.
pub fn handle(
    ctx: &ExecutionContext,
    previous: &Path,
    current: &Path,
    date_stamp: Option<String>,
) -> Result<bool> {
    let earlier = read_link_report(previous)
        .with_context(|| format!("reading {}", previous.display()))?;
    let later =
        read_link_report(current).with_context(|| format!("reading {}", current.display()))?;

    let diff = diff_failures(&failing_keys(&earlier), &later);
    let stamp = ctx.stamp(date_stamp);
    let (new_path, recovered_path) = save_diff(ctx.output_dir(), &stamp, &diff)?;

    let mut rows = diff.newly_failed.clone();
    rows.extend(diff.recovered.iter().cloned());
    let table = link_table(&rows, ctx.color());
    let footer = format!(
        "{} new failure(s): {}\n{} recovered: {}",
        diff.newly_failed.len(),
        new_path.display(),
        diff.recovered.len(),
        recovered_path.display()
    );
    let body = json!({
        "new_failures": new_path,
        "recovered_file": recovered_path,
        "diff": diff,
    });
    emit(ctx, &table, &body, Some(footer))?;

    Ok(!diff.newly_failed.is_empty())
}
