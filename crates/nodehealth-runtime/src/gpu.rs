use crate::config::GpuConfig;
use nodehealth_core::{CommandRunner, CommandSpec, run_bounded};
use nodehealth_engine::gpu::{
    bandwidth_issues, burn_issues, busy_issue, ecc_issues, overall_status, remap_issues,
    throttle_issues, xid_issues,
};
use nodehealth_providers::bandwidth::{self, Direction};
use nodehealth_providers::{burn, dmesg, nvidia_smi};
use nodehealth_types::{
    BandwidthRecord, GpuCheckKind, GpuHealthReport, HostIdentity, MISSING_F64, Severity,
};
use tracing::{debug, error, info, warn};

const ALL_CHECKS: [GpuCheckKind; 6] = [
    GpuCheckKind::Ecc,
    GpuCheckKind::RowRemap,
    GpuCheckKind::Xid,
    GpuCheckKind::Throttle,
    GpuCheckKind::Bandwidth,
    GpuCheckKind::Burn,
];

pub struct GpuCheck<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a GpuConfig,
}

impl<'a> GpuCheck<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a GpuConfig) -> Self {
        Self { runner, config }
    }

    /// Run every GPU check on this host.
    ///
    /// Checks whose tool is missing or fails are listed in `skipped`.
    pub async fn run(&self, identity: &HostIdentity) -> GpuHealthReport {
        let mut report = GpuHealthReport::new(&identity.hostname, &identity.serial);

        let Some(listing) = self.query(nvidia_smi::list_command(), None, &mut report).await else {
            warn!(host = %identity.hostname, "nvidia-smi unavailable; skipping GPU checks");
            report.skipped = self.enabled_checks();
            return report;
        };
        let gpu_count = nvidia_smi::parse_gpu_count(&listing);
        debug!(gpus = gpu_count, "found GPUs");

        if let Some(out) = self
            .query(nvidia_smi::ecc_command(), Some(GpuCheckKind::Ecc), &mut report)
            .await
        {
            report.issues.extend(ecc_issues(&nvidia_smi::parse_ecc(&out)));
        }

        if let Some(out) = self
            .query(nvidia_smi::remap_command(), Some(GpuCheckKind::RowRemap), &mut report)
            .await
        {
            let rows = nvidia_smi::parse_remapped_rows(&out);
            report.issues.extend(remap_issues(&rows, &self.config.thresholds));
        }

        if let Some(out) = self
            .query(dmesg::command(), Some(GpuCheckKind::Xid), &mut report)
            .await
        {
            report.xid_events = dmesg::parse_xid(&out);
            report.issues.extend(xid_issues(&report.xid_events));
        }

        if let Some(out) = self
            .query(nvidia_smi::throttle_command(), Some(GpuCheckKind::Throttle), &mut report)
            .await
        {
            report.issues.extend(throttle_issues(&nvidia_smi::parse_throttle(&out)));
        }

        if self.config.bandwidth {
            self.bandwidth(gpu_count, &mut report).await;
        }

        if self.config.burn {
            self.burn(gpu_count, &mut report).await;
        }

        report.status = overall_status(&report.issues);
        for issue in &report.issues {
            let line = issue.log_line(&identity.serial);
            match issue.severity {
                Severity::Failed => error!("{}", line),
                _ => warn!("{}", line),
            }
        }
        info!(
            host = %identity.hostname,
            status = %report.status,
            skipped = report.skipped.len(),
            "GPU checks finished"
        );
        report
    }

    fn enabled_checks(&self) -> Vec<GpuCheckKind> {
        ALL_CHECKS
            .into_iter()
            .filter(|check| match check {
                GpuCheckKind::Bandwidth => self.config.bandwidth,
                GpuCheckKind::Burn => self.config.burn,
                _ => true,
            })
            .collect()
    }

    /// Stdout of `spec`, or `None` after recording the check as skipped.
    async fn query(
        &self,
        spec: CommandSpec,
        check: Option<GpuCheckKind>,
        report: &mut GpuHealthReport,
    ) -> Option<String> {
        let output = self.runner.run(&spec.timeout(self.config.timeout())).await;
        if !output.success() {
            if let Some(check) = check {
                warn!(
                    check = %check,
                    reason = %output.failure_reason().unwrap_or_default(),
                    "GPU check skipped"
                );
                report.skipped.push(check);
            }
            return None;
        }
        if let Some(check) = check {
            report.checks_run.push(check);
        }
        Some(output.stdout)
    }

    /// Whether the GPUs are idle enough for `check`. Busy GPUs fail the check.
    async fn gpus_idle(&self, check: GpuCheckKind, report: &mut GpuHealthReport) -> bool {
        let Some(processes) = self
            .query(nvidia_smi::processes_command(), Some(check), report)
            .await
        else {
            return false;
        };
        if nvidia_smi::has_running_processes(&processes) {
            warn!(check = %check, "GPUs have running processes; not running stress test");
            report.issues.push(busy_issue(check));
            return false;
        }
        true
    }

    async fn bandwidth(&self, gpu_count: usize, report: &mut GpuHealthReport) {
        if !self.gpus_idle(GpuCheckKind::Bandwidth, report).await {
            return;
        }

        let numa = self.runner.run(&bandwidth::numactl_command()).await;
        let numa_nodes = bandwidth::parse_numa_nodes(&numa.stdout).unwrap_or(1);

        let mut records = Vec::with_capacity(gpu_count);
        for gpu in 0..gpu_count {
            let node = bandwidth::numa_node_for_gpu(gpu, gpu_count, numa_nodes);
            let mut record = BandwidthRecord::new(gpu, node);
            for iteration in 0..self.config.bandwidth_iterations.max(1) {
                record.htod.push(self.sample(gpu, node, Direction::HostToDevice).await);
                record.dtoh.push(self.sample(gpu, node, Direction::DeviceToHost).await);
                debug!(gpu, iteration, "bandwidth iteration done");
            }
            records.push(record);
        }

        report
            .issues
            .extend(bandwidth_issues(&mut records, &self.config.thresholds));
        report.bandwidth = records;
    }

    /// One gpu_burn per GPU, all running at once.
    async fn burn(&self, gpu_count: usize, report: &mut GpuHealthReport) {
        if !self.gpus_idle(GpuCheckKind::Burn, report).await {
            return;
        }

        let runner = self.runner;
        let dir = &self.config.burn_dir;
        let seconds = self.config.burn_seconds;
        let timeout = self.config.burn_timeout();
        info!(gpus = gpu_count, seconds, dir = %dir.display(), "running gpu_burn");

        let mut records = run_bounded(0..gpu_count, gpu_count, |gpu| async move {
            let output = runner.run(&burn::command(dir, gpu, seconds, timeout)).await;
            if !output.success() {
                warn!(
                    gpu,
                    reason = %output.failure_reason().unwrap_or_default(),
                    "gpu_burn run failed"
                );
            }
            burn::parse_burn(gpu, &output.stdout)
        })
        .await;
        records.sort_by_key(|record| record.gpu);

        report.issues.extend(burn_issues(&mut records, &self.config.thresholds));
        report.burn = records;
    }

    /// GB/s for one run, or the sentinel when the run failed.
    async fn sample(&self, gpu: usize, node: usize, direction: Direction) -> f64 {
        let spec = bandwidth::command(
            &self.config.bandwidth_binary,
            gpu,
            node,
            direction,
            self.config.timeout(),
        );
        let output = self.runner.run(&spec).await;
        match bandwidth::parse_bandwidth(&output.stdout) {
            Some(gbps) if output.success() => gbps,
            _ => {
                let reason = output
                    .failure_reason()
                    .unwrap_or_else(|| "no result row".to_string());
                warn!(gpu, ?direction, %reason, "bandwidth run failed");
                MISSING_F64
            }
        }
    }
}
