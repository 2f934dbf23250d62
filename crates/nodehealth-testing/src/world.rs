//! TestWorld pattern for CLI integration tests.
//!
//! Every world owns a temp directory with an `out/` report directory and a
//! private config path, so tests never read the user's configuration.

use anyhow::Result;
use assert_cmd::Command;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::fixtures::SampleFiles;

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use nodehealth_testing::TestWorld;
///
/// let world = TestWorld::new();
/// let result = world.run(&["decode-ipv6", "fd00::1"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    output_dir: PathBuf,
    config_path: PathBuf,
    env_vars: HashMap<String, String>,
    samples: SampleFiles,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");
        let config_path = temp_dir.path().join("config.toml");

        Self {
            temp_dir,
            output_dir,
            config_path,
            env_vars: HashMap::new(),
            samples: SampleFiles::new(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Where the CLI writes reports (`--output-dir`).
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Write the TOML config the CLI will load.
    pub fn with_config(self, toml: &str) -> Self {
        std::fs::write(&self.config_path, toml).expect("Failed to write config");
        self
    }

    /// Write a file relative to the temp root and return its path.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Copy a provider sample to a path relative to the temp root.
    pub fn copy_sample(&self, sample_name: &str, relative: &str) -> Result<PathBuf> {
        let dest = self.temp_dir.path().join(relative);
        self.samples.copy_to(sample_name, &dest)?;
        Ok(dest)
    }

    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--config")
            .arg(&self.config_path)
            .arg("--output-dir")
            .arg(&self.output_dir)
            .arg("--log-level")
            .arg("error");

        cmd.current_dir(self.temp_dir.path());
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }

    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("nodehealth")
            .map_err(|e| anyhow::anyhow!("Failed to find nodehealth binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Report files in the output directory whose names start with `prefix`.
    pub fn reports(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
            {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
