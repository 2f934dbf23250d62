//! Subprocess execution for diagnostic tools.
//!
//! Every vendor tool is invoked through [`CommandRunner`], which never returns
//! an error: spawn failures, non-zero exits and timeouts are all folded into
//! [`CommandOutput`] so one broken unit can never abort a batch.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Per-unit timeout for local tool invocations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-host timeout for remote (SSH/SCP) invocations.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    /// Run through `sudo` unless already root.
    pub sudo: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            sudo: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sudo(mut self) -> Self {
        self.sudo = true;
        self
    }

    /// Shell-like rendering used in logs and fleet step results.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if self.sudo {
            parts.push("sudo".to_string());
        }
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub not_found: bool,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn completed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    pub fn timeout() -> Self {
        Self {
            timed_out: true,
            stderr: "timed out".to_string(),
            ..Self::default()
        }
    }

    pub fn not_found(program: &str) -> Self {
        Self {
            not_found: true,
            stderr: format!("{}: command not found", program),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && !self.not_found && self.exit_code == Some(0)
    }

    /// One-line description of why the command did not succeed.
    pub fn failure_reason(&self) -> Option<String> {
        if self.success() {
            return None;
        }
        if self.timed_out {
            return Some("timed out".to_string());
        }
        if self.not_found {
            return Some("command not found".to_string());
        }
        let stderr = self.stderr.trim();
        Some(match (self.exit_code, stderr.is_empty()) {
            (Some(code), true) => format!("exit code {}", code),
            (Some(code), false) => format!("exit code {}: {}", code, first_line(stderr)),
            (None, _) => first_line(stderr).to_string(),
        })
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or(s)
}

/// Executes diagnostic commands.
///
/// Implementations must fold every failure mode into the returned output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput;
}

/// Runs commands as local subprocesses with a hard timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    is_root: bool,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            is_root: crate::host::is_root(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput {
        let mut command = if spec.sudo && !self.is_root {
            let mut command = Command::new("sudo");
            command.arg(&spec.program);
            command
        } else {
            Command::new(&spec.program)
        };

        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %spec.display(), "running");
        let started = Instant::now();

        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(program = %spec.program, "command not found");
                return CommandOutput::not_found(&spec.program);
            }
            Err(err) => {
                warn!(command = %spec.display(), error = %err, "failed to spawn");
                return CommandOutput {
                    stderr: err.to_string(),
                    ..CommandOutput::default()
                };
            }
        };

        // Dropping the wait future on timeout kills the child.
        let mut output = match timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let exit_code = output.status.code();
                CommandOutput {
                    not_found: spec.sudo && exit_code == Some(1) && sudo_not_found(&stderr),
                    exit_code,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr,
                    ..CommandOutput::default()
                }
            }
            Ok(Err(err)) => {
                warn!(command = %spec.display(), error = %err, "failed to collect output");
                CommandOutput {
                    stderr: err.to_string(),
                    ..CommandOutput::default()
                }
            }
            Err(_) => {
                warn!(
                    command = %spec.display(),
                    timeout_secs = spec.timeout.as_secs(),
                    "command timed out"
                );
                CommandOutput::timeout()
            }
        };

        output.elapsed = started.elapsed();
        if let Some(reason) = output.failure_reason() {
            debug!(command = %spec.display(), reason = %reason, "command did not succeed");
        }
        output
    }
}

fn sudo_not_found(stderr: &str) -> bool {
    stderr.starts_with("sudo:") && stderr.contains("command not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_sudo() {
        let spec = CommandSpec::new("mlxlink")
            .args(["-d", "mlx5_0", "--json"])
            .sudo();
        assert_eq!(spec.display(), "sudo mlxlink -d mlx5_0 --json");
    }

    #[test]
    fn test_failure_reason() {
        assert_eq!(CommandOutput::completed(0, "ok", "").failure_reason(), None);
        assert_eq!(
            CommandOutput::completed(2, "", "boom\nmore").failure_reason(),
            Some("exit code 2: boom".to_string())
        );
        assert_eq!(
            CommandOutput::timeout().failure_reason(),
            Some("timed out".to_string())
        );
        assert!(!CommandOutput::not_found("nvidia-smi").success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(&CommandSpec::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]))
            .await;
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(&CommandSpec::new("definitely-not-a-real-tool-xyz"))
            .await;
        assert!(output.not_found);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(
                &CommandSpec::new("sleep")
                    .arg("5")
                    .timeout(Duration::from_millis(100)),
            )
            .await;
        assert!(output.timed_out);
        assert!(output.elapsed < Duration::from_secs(5));
    }
}
