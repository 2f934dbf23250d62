//! `osu_latency` runs between two hosts over a chosen pair of NICs.

use crate::value::parse_f64;
use nodehealth_core::CommandSpec;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static EIGHT_BYTE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^8\s+(\S+)").unwrap());

/// One side of a latency run.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub interface: u32,
    pub numa_node: u32,
}

fn rank_args(osu_dir: &Path, end: &Endpoint<'_>) -> Vec<String> {
    vec![
        "-n".to_string(),
        "1".to_string(),
        "--host".to_string(),
        end.host.to_string(),
        "-x".to_string(),
        format!("UCX_NET_DEVICES=mlx5_{}:1", end.interface),
        "--map-by".to_string(),
        "node".to_string(),
        "-x".to_string(),
        "LD_LIBRARY_PATH".to_string(),
        "numactl".to_string(),
        "-N".to_string(),
        end.numa_node.to_string(),
        osu_dir.join("osu_latency").display().to_string(),
        "-m".to_string(),
        "8:8".to_string(),
    ]
}

pub fn command(
    mpirun: &str,
    osu_dir: &Path,
    client: &Endpoint<'_>,
    server: &Endpoint<'_>,
    timeout: Duration,
) -> CommandSpec {
    CommandSpec::new(mpirun)
        .args(rank_args(osu_dir, client))
        .arg(":")
        .args(rank_args(osu_dir, server))
        .timeout(timeout)
}

/// Latency in microseconds for the 8-byte message.
pub fn parse_latency(output: &str) -> Option<f64> {
    EIGHT_BYTE_ROW
        .captures(output)
        .and_then(|caps| parse_f64(&caps[1]))
}
