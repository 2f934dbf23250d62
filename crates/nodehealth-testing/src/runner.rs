//! Canned command execution.

use async_trait::async_trait;
use nodehealth_core::{CommandOutput, CommandRunner, CommandSpec};
use std::sync::Mutex;

/// Answers commands from a script of `(prefix, output)` rules.
///
/// A command matches a rule when its rendered line (without `sudo`) starts
/// with the prefix. The first matching rule wins; unmatched commands behave
/// like a missing binary.
///
/// # Example
/// ```
/// use nodehealth_core::CommandOutput;
/// use nodehealth_testing::ScriptedRunner;
///
/// let _runner = ScriptedRunner::new()
///     .on_stdout("uptime -s", "2024-01-08 09:00:05\n")
///     .on("mlxlink -m -e -c -d mlx5_9", CommandOutput::timeout());
/// ```
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.rules.push((prefix.into(), output));
        self
    }

    /// Shorthand for a successful command printing `stdout`.
    pub fn on_stdout(self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.on(prefix, CommandOutput::completed(0, stdout, ""))
    }

    /// Rendered lines of every command run so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn was_called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

fn line(spec: &CommandSpec) -> String {
    std::iter::once(spec.program.as_str())
        .chain(spec.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput {
        let line = line(spec);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        self.rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::not_found(&spec.program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let runner = ScriptedRunner::new()
            .on_stdout("rdma link", "first")
            .on_stdout("rdma", "second");

        let out = runner.run(&CommandSpec::new("rdma").arg("link")).await;
        assert_eq!(out.stdout, "first");

        let out = runner.run(&CommandSpec::new("rdma").arg("dev")).await;
        assert_eq!(out.stdout, "second");

        let out = runner.run(&CommandSpec::new("mlxreg").sudo()).await;
        assert!(out.not_found);
        assert_eq!(runner.calls(), vec!["rdma link", "rdma dev", "mlxreg"]);
    }
}
