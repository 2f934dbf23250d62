//! Fleet fan-out: copy the binary to each host over SCP, run a link check
//! there over SSH and bring the CSV report back.

use crate::config::FleetConfig;
use crate::error::{Error, Result};
use crate::report::{self, ReportFormat};
use nodehealth_core::{CommandOutput, CommandRunner, CommandSpec, natural_cmp, run_bounded};
use nodehealth_types::{FleetStep, FleetStepResult, LinkRecord, StepStatus};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const STEPS: [FleetStep; 4] = [
    FleetStep::Setup,
    FleetStep::Distribute,
    FleetStep::Execute,
    FleetStep::Collect,
];

/// What to run on every host.
#[derive(Debug, Clone)]
pub struct FleetJob {
    /// Local `nodehealth` binary copied to each host.
    pub executable: PathBuf,
    pub stamp: String,
    /// Extra arguments appended to the remote `link` command.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FleetOutcome {
    pub steps: Vec<FleetStepResult>,
    /// Reports copied back, one per host whose run completed.
    pub collected: Vec<PathBuf>,
}

impl FleetOutcome {
    pub fn failed_hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Fail)
            .map(|s| s.host.as_str())
            .collect();
        hosts.sort_by(|a, b| natural_cmp(a, b));
        hosts.dedup();
        hosts
    }
}

pub struct Fleet<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a FleetConfig,
}

impl<'a> Fleet<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a FleetConfig) -> Self {
        Self { runner, config }
    }

    fn target(&self, host: &str) -> String {
        match &self.config.user {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        }
    }

    fn ssh(&self, host: &str, remote: String) -> CommandSpec {
        let mut spec = CommandSpec::new("ssh").args(["-o", "BatchMode=yes"]);
        if let Some(port) = self.config.port {
            spec = spec.arg("-p").arg(port.to_string());
        }
        if let Some(key) = &self.config.identity_file {
            spec = spec.arg("-i").arg(key.display().to_string());
        }
        spec.arg(self.target(host))
            .arg(remote)
            .timeout(self.config.timeout())
    }

    fn scp(&self, from: String, to: String) -> CommandSpec {
        let mut spec = CommandSpec::new("scp").args(["-o", "BatchMode=yes"]);
        if let Some(port) = self.config.port {
            spec = spec.arg("-P").arg(port.to_string());
        }
        if let Some(key) = &self.config.identity_file {
            spec = spec.arg("-i").arg(key.display().to_string());
        }
        spec.arg(from).arg(to).timeout(self.config.timeout())
    }

    /// Report file the remote run leaves in the working directory.
    pub fn report_name(host: &str, stamp: &str) -> String {
        report::link_report_name(host, stamp, ReportFormat::Csv)
    }

    /// Command for one step on one host.
    pub fn step_command(
        &self,
        job: &FleetJob,
        host: &str,
        step: FleetStep,
        local_dir: &Path,
    ) -> Result<CommandSpec> {
        let dir = &self.config.remote_dir;
        let exe_name = job
            .executable
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "not an executable path: {}",
                    job.executable.display()
                ))
            })?;

        Ok(match step {
            FleetStep::Setup => self.ssh(host, format!("mkdir -p {}", dir)),
            FleetStep::Distribute => self.scp(
                job.executable.display().to_string(),
                format!("{}:{}", self.target(host), dir),
            ),
            FleetStep::Execute => {
                let mut remote = format!(
                    "cd {}; ./{} --output-dir . link --date-stamp {} --address {} --format csv",
                    dir, exe_name, job.stamp, host
                );
                for arg in &job.extra_args {
                    remote.push(' ');
                    remote.push_str(arg);
                }
                self.ssh(host, remote)
            }
            FleetStep::Collect => self.scp(
                format!(
                    "{}:{}/{}",
                    self.target(host),
                    dir,
                    Self::report_name(host, &job.stamp)
                ),
                local_dir.display().to_string(),
            ),
        })
    }

    async fn run_host(&self, job: &FleetJob, host: &str, local_dir: &Path) -> Vec<FleetStepResult> {
        let mut results = Vec::with_capacity(STEPS.len());
        for step in STEPS {
            let spec = match self.step_command(job, host, step, local_dir) {
                Ok(spec) => spec,
                Err(err) => {
                    results.push(FleetStepResult {
                        host: host.to_string(),
                        step,
                        status: StepStatus::Fail,
                        command: String::new(),
                        output: err.to_string(),
                    });
                    break;
                }
            };
            let output = self.runner.run(&spec).await;
            let result = step_result(host, step, spec.display(), &output);
            let failed = result.status == StepStatus::Fail;
            if failed {
                warn!(host, step = %step, output = %result.output, "fleet step failed");
            }
            results.push(result);
            if failed {
                break;
            }
        }
        results
    }

    /// Run every step on every host, `concurrency` hosts at a time.
    ///
    /// A host stops at its first failed step; other hosts carry on.
    pub async fn run(
        &self,
        hosts: &[String],
        job: &FleetJob,
        local_dir: &Path,
    ) -> Result<FleetOutcome> {
        std::fs::create_dir_all(local_dir)?;
        info!(
            hosts = hosts.len(),
            concurrency = self.config.concurrency,
            remote_dir = %self.config.remote_dir,
            "starting fleet run"
        );

        let per_host = run_bounded(hosts.iter(), self.config.concurrency, |host| async move {
            (host, self.run_host(job, host, local_dir).await)
        })
        .await;

        let mut outcome = FleetOutcome::default();
        for (host, steps) in per_host {
            let completed = steps
                .iter()
                .any(|s| s.step == FleetStep::Collect && s.status == StepStatus::Pass);
            if completed {
                outcome
                    .collected
                    .push(local_dir.join(Self::report_name(host, &job.stamp)));
            }
            outcome.steps.extend(steps);
        }
        outcome.steps.sort_by(|a, b| {
            natural_cmp(&a.host, &b.host).then(step_index(a.step).cmp(&step_index(b.step)))
        });
        outcome.collected.sort();

        info!(
            collected = outcome.collected.len(),
            failed = outcome.failed_hosts().len(),
            "fleet run finished"
        );
        Ok(outcome)
    }
}

fn step_index(step: FleetStep) -> usize {
    STEPS.iter().position(|s| *s == step).unwrap_or(STEPS.len())
}

fn step_result(
    host: &str,
    step: FleetStep,
    command: String,
    output: &CommandOutput,
) -> FleetStepResult {
    let (status, text) = if output.success() {
        (StepStatus::Pass, output.stdout.trim().to_string())
    } else {
        (StepStatus::Fail, output.failure_reason().unwrap_or_default())
    };
    FleetStepResult {
        host: host.to_string(),
        step,
        status,
        command,
        output: text,
    }
}

/// Read and concatenate collected reports. Unreadable files are skipped.
pub fn merge_reports(paths: &[PathBuf]) -> Vec<LinkRecord> {
    let mut records = Vec::new();
    for path in paths {
        match report::read_link_report(path) {
            Ok(mut found) => records.append(&mut found),
            Err(err) => warn!(file = %path.display(), error = %err, "skipping unreadable report"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodehealth_testing::ScriptedRunner;

    fn job() -> FleetJob {
        FleetJob {
            executable: PathBuf::from("/usr/local/bin/nodehealth"),
            stamp: "20240110120000".to_string(),
            extra_args: vec!["--errors-only".to_string()],
        }
    }

    #[test]
    fn test_step_commands_carry_ssh_options() -> Result<()> {
        let config = FleetConfig {
            user: Some("opc".to_string()),
            port: Some(2222),
            ..FleetConfig::default()
        };
        let runner = ScriptedRunner::new();
        let fleet = Fleet::new(&runner, &config);
        let local = Path::new("/tmp/reports");

        let setup = fleet.step_command(&job(), "gpu-1", FleetStep::Setup, local)?;
        assert_eq!(
            setup.display(),
            "ssh -o BatchMode=yes -p 2222 opc@gpu-1 mkdir -p /tmp/nodehealth"
        );

        let distribute = fleet.step_command(&job(), "gpu-1", FleetStep::Distribute, local)?;
        assert_eq!(
            distribute.display(),
            "scp -o BatchMode=yes -P 2222 /usr/local/bin/nodehealth opc@gpu-1:/tmp/nodehealth"
        );

        let execute = fleet.step_command(&job(), "gpu-1", FleetStep::Execute, local)?;
        assert!(execute.display().ends_with(
            "cd /tmp/nodehealth; ./nodehealth --output-dir . link --date-stamp 20240110120000 --address gpu-1 --format csv --errors-only"
        ));

        let collect = fleet.step_command(&job(), "gpu-1", FleetStep::Collect, local)?;
        assert_eq!(
            collect.display(),
            "scp -o BatchMode=yes -P 2222 opc@gpu-1:/tmp/nodehealth/mlxlink_info_gpu-1_20240110120000.csv /tmp/reports"
        );
        Ok(())
    }

    #[test]
    fn test_step_command_rejects_bad_executable() {
        let config = FleetConfig::default();
        let runner = ScriptedRunner::new();
        let fleet = Fleet::new(&runner, &config);
        let bad = FleetJob {
            executable: PathBuf::from("/"),
            ..job()
        };
        assert!(
            fleet
                .step_command(&bad, "gpu-1", FleetStep::Distribute, Path::new("."))
                .is_err()
        );
    }
}
