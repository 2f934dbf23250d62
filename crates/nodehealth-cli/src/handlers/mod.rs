pub mod config;
pub mod decode_ipv6;
pub mod diff;
pub mod fleet;
pub mod gpu;
pub mod link;
pub mod mapping;
pub mod rail_latency;
pub mod renumber;
pub mod rttcc;
pub mod snapshot;

use crate::context::ExecutionContext;
use crate::types::OutputFormat;
use crate::views::Table;
use anyhow::Result;
use serde::Serialize;

/// Print a command's result in the requested output format.
///
/// `footer` only appears under the table rendering.
pub(crate) fn emit<T: Serialize + ?Sized>(
    ctx: &ExecutionContext,
    table: &Table,
    json: &T,
    footer: Option<String>,
) -> Result<()> {
    match ctx.format {
        OutputFormat::Table => {
            print!("{}", table);
            if let Some(footer) = footer {
                println!("{}", footer);
            }
        }
        OutputFormat::Csv => table.write_csv(std::io::stdout().lock())?,
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(json)?),
    }
    Ok(())
}
