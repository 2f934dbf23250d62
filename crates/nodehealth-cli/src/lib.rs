mod args;
mod commands;
pub mod context;
mod handlers;
mod logging;
pub mod types;
pub mod views;

pub use args::{Cli, Commands, ConfigCommand};
pub use commands::run;
