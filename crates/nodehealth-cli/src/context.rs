use crate::types::OutputFormat;
use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDateTime};
use is_terminal::IsTerminal;
use nodehealth_core::ProcessRunner;
use nodehealth_runtime::Config;
use nodehealth_runtime::report::datestamp;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Everything a handler needs besides its own arguments.
pub struct ExecutionContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub fail_on_issues: bool,
    pub runner: ProcessRunner,
    color: bool,
    now: NaiveDateTime,
}

impl ExecutionContext {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        format: OutputFormat,
        fail_on_issues: bool,
    ) -> Self {
        Self {
            config,
            config_path,
            format,
            fail_on_issues,
            runner: ProcessRunner::new(),
            color: std::io::stdout().is_terminal(),
            now: Local::now().naive_local(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.report.output_dir
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Wall-clock time the command started, in local time like `dmesg -T`.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn stamp(&self, explicit: Option<String>) -> String {
        explicit.unwrap_or_else(|| datestamp(self.now))
    }

    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("starting async runtime")?;
        Ok(runtime.block_on(future))
    }

    /// Process exit status for a finished check.
    pub fn exit_code(&self, failed: bool) -> i32 {
        if failed && (self.fail_on_issues || self.config.report.exit_on_failure) {
            2
        } else {
            0
        }
    }
}
