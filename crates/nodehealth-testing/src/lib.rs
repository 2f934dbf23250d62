//! Testing infrastructure for nodehealth integration tests.
//!
//! - `ScriptedRunner`: a `CommandRunner` that answers from canned outputs
//! - `fixtures`: sample tool output shipped with the providers crate
//! - `TestWorld`: isolated temp directory for driving the CLI binary
//! - `assertions`: report-level checks on CSV and JSON output

pub mod assertions;
pub mod fixtures;
pub mod runner;
pub mod world;

pub use fixtures::SampleFiles;
pub use runner::ScriptedRunner;
pub use world::{CliResult, TestWorld};
