use super::emit;
use crate::context::ExecutionContext;
use crate::views::{link_table, summary_line};
use anyhow::{Context, Result};
use nodehealth_core::host::{collect_identity, local_hostname};
use nodehealth_engine::{diff_failures, failing_keys, failures_first, summarize};
use nodehealth_runtime::LinkCheck;
use nodehealth_runtime::link::save_raw;
use nodehealth_runtime::report::{read_link_report, save_diff, save_link_report};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

pub struct LinkOptions {
    pub from_dir: Option<PathBuf>,
    pub address: Option<String>,
    pub date_stamp: Option<String>,
    pub previous: Option<PathBuf>,
    pub errors_only: bool,
    pub failures_first: bool,
    pub save_raw: bool,
}

/// Returns whether any link failed.
pub fn handle(ctx: &ExecutionContext, options: LinkOptions) -> Result<bool> {
    let config = &ctx.config.link;
    let check = LinkCheck::new(&ctx.runner, config);
    let dir = ctx.output_dir();
    let stamp = ctx.stamp(options.date_stamp);

    let (mut records, hostname) = match &options.from_dir {
        Some(source) => {
            let records = check
                .replay(source)
                .with_context(|| format!("replaying {}", source.display()))?;
            let hostname = records
                .first()
                .map(|r| r.hostname.clone())
                .unwrap_or_else(local_hostname);
            (records, hostname)
        }
        None => {
            let (identity, run) = ctx.block_on(async {
                let identity = collect_identity(&ctx.runner).await;
                let run = check.run(&identity, ctx.now()).await;
                (identity, run)
            })?;
            if options.save_raw || config.save_raw {
                let saved = save_raw(dir, &identity.hostname, &run.raw)?;
                info!(files = saved.len(), "saved raw mlxlink output");
            }
            (run.records, identity.hostname)
        }
    };

    if let Some(address) = &options.address {
        for record in &mut records {
            record.ip_addr = Some(address.clone());
        }
    }
    if options.failures_first || ctx.config.report.failures_first {
        failures_first(&mut records);
    }

    let target = options.address.as_deref().unwrap_or(&hostname);
    let report = save_link_report(dir, target, &stamp, ctx.format.report_format(), &records)?;

    let diff = match &options.previous {
        Some(previous) => {
            let earlier = read_link_report(previous)
                .with_context(|| format!("reading {}", previous.display()))?;
            let diff = diff_failures(&failing_keys(&earlier), &records);
            let (new_path, recovered_path) = save_diff(dir, &stamp, &diff)?;
            info!(
                new = diff.newly_failed.len(),
                recovered = diff.recovered.len(),
                new_failures = %new_path.display(),
                recovered_file = %recovered_path.display(),
                "compared with previous report"
            );
            Some(diff)
        }
        None => None,
    };

    let summary = summarize(&records);
    if options.errors_only {
        records.retain(|r| !r.status.is_passed());
    }

    let table = link_table(&records, ctx.color());
    let mut footer = format!("{}\nReport: {}", summary_line(&summary), report.display());
    if let Some(diff) = &diff {
        footer.push_str(&format!(
            "\n{} new failure(s), {} recovered",
            diff.newly_failed.len(),
            diff.recovered.len()
        ));
    }
    let body = json!({
        "report": report,
        "summary": summary,
        "diff": diff,
        "records": records,
    });
    emit(ctx, &table, &body, Some(footer))?;

    Ok(summary.failed > 0)
}
