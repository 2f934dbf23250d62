//! Normalizers for vendor diagnostic tools.
//!
//! Each module owns one tool's output format and turns it into the flat
//! records from `nodehealth-types`. Parsers are tolerant: missing or
//! malformed fields become sentinels rather than errors.

pub mod bandwidth;
pub mod burn;
pub mod dmesg;
pub mod error;
pub mod latency;
pub mod mlxlink;
pub mod nvidia_smi;
pub mod rdma;
pub mod topology;
pub mod uptime;
mod value;

pub use error::{Error, Result};
pub use mlxlink::{LinkContext, normalize_link, normalize_link_json, read_saved_link};
pub use topology::Shape;
