pub mod error;
pub mod exec;
pub mod host;
pub mod hostlist;
pub mod natsort;
pub mod pool;

pub use error::{Error, Result};
pub use exec::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use natsort::natural_cmp;
pub use pool::run_bounded;
