use super::emit;
use crate::context::ExecutionContext;
use crate::views::{fleet_table, summary_line};
use anyhow::{Context, Result, bail};
use nodehealth_core::hostlist::{expand_pattern, read_hostfile};
use nodehealth_core::natural_cmp;
use nodehealth_engine::{sort_records, summarize};
use nodehealth_runtime::fleet::merge_reports;
use nodehealth_runtime::report::{link_report_name, write_json, write_link_report};
use nodehealth_runtime::{Fleet, FleetJob, ReportFormat};
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;

pub struct FleetOptions {
    pub hostfile: Option<PathBuf>,
    pub hosts: Vec<String>,
    pub executable: Option<PathBuf>,
    pub date_stamp: Option<String>,
    pub remote_args: Vec<String>,
}

fn resolve_hosts(options: &FleetOptions) -> Result<Vec<String>> {
    let mut hosts = match &options.hostfile {
        Some(path) => read_hostfile(path)
            .with_context(|| format!("reading host file {}", path.display()))?,
        None => {
            let mut hosts = Vec::new();
            for pattern in &options.hosts {
                hosts.extend(expand_pattern(pattern)?);
            }
            hosts
        }
    };
    hosts.sort_by(|a, b| natural_cmp(a, b));
    hosts.dedup();
    if hosts.is_empty() {
        bail!("no hosts given; pass --hostfile or --hosts");
    }
    Ok(hosts)
}

/// Returns whether a host step or a merged link failed.
pub fn handle(ctx: &ExecutionContext, options: FleetOptions) -> Result<bool> {
    let hosts = resolve_hosts(&options)?;
    let executable = match options.executable {
        Some(path) => path,
        None => std::env::current_exe().context("locating this executable")?,
    };
    let job = FleetJob {
        executable,
        stamp: ctx.stamp(options.date_stamp),
        extra_args: options.remote_args,
    };

    let dir = ctx.output_dir();
    let fleet = Fleet::new(&ctx.runner, &ctx.config.fleet);
    let outcome = ctx.block_on(fleet.run(&hosts, &job, dir))??;

    let failed_hosts = outcome.failed_hosts();
    for host in &failed_hosts {
        warn!(host, "host did not complete every step");
    }

    let steps_path = dir.join(format!("fleet_steps_{}.json", job.stamp));
    write_json(&steps_path, &outcome.steps)?;

    let mut records = merge_reports(&outcome.collected);
    sort_records(&mut records);
    let merged_path = dir.join(link_report_name("fleet", &job.stamp, ReportFormat::Csv));
    write_link_report(&merged_path, &records)?;
    let summary = summarize(&records);

    let table = fleet_table(&outcome.steps, ctx.color());
    let footer = format!(
        "{} of {} host(s) completed\n{}\nMerged report: {}",
        hosts.len() - failed_hosts.len(),
        hosts.len(),
        summary_line(&summary),
        merged_path.display()
    );
    let body = json!({
        "steps": outcome.steps,
        "failed_hosts": failed_hosts,
        "merged_report": merged_path,
        "summary": summary,
    });
    emit(ctx, &table, &body, Some(footer))?;

    Ok(!failed_hosts.is_empty() || summary.failed > 0)
}
