use clap::ValueEnum;
use nodehealth_engine::ClassificationPolicy;
use nodehealth_providers::Shape;
use nodehealth_runtime::ReportFormat;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Table,
}

impl OutputFormat {
    /// Format of the report file written for this output mode.
    pub fn report_format(self) -> ReportFormat {
        match self {
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Csv | OutputFormat::Table => ReportFormat::Csv,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ShapeArg {
    H100,
    H100t,
    H200,
    A100,
}

impl From<ShapeArg> for Shape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::H100 => Shape::H100,
            ShapeArg::H100t => Shape::H100T,
            ShapeArg::H200 => Shape::H200,
            ShapeArg::A100 => Shape::A100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum PolicyArg {
    LastMatch,
    SeverityRanked,
}

impl From<PolicyArg> for ClassificationPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::LastMatch => ClassificationPolicy::LastMatchWins,
            PolicyArg::SeverityRanked => ClassificationPolicy::SeverityRanked,
        }
    }
}
