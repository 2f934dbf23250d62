//! CUDA `bandwidthTest` runs pinned to the GPU's NUMA node.

use crate::value::parse_f64;
use nodehealth_core::CommandSpec;
use std::path::Path;
use std::time::Duration;

/// Transfer size whose row is read from the bandwidthTest table.
pub const TRANSFER_SIZE: &str = "32000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl Direction {
    fn flag(self) -> &'static str {
        match self {
            Direction::HostToDevice => "--htod",
            Direction::DeviceToHost => "--dtoh",
        }
    }
}

pub fn numactl_command() -> CommandSpec {
    CommandSpec::new("numactl").arg("-H")
}

pub fn command(
    binary: &Path,
    gpu: usize,
    numa_node: usize,
    direction: Direction,
    timeout: Duration,
) -> CommandSpec {
    CommandSpec::new("numactl")
        .arg(format!("-N{}", numa_node))
        .arg(format!("-m{}", numa_node))
        .arg(binary.display().to_string())
        .arg(direction.flag())
        .env("CUDA_VISIBLE_DEVICES", gpu.to_string())
        .timeout(timeout)
}

/// GB/s for [`TRANSFER_SIZE`], or `None` when the row is absent.
pub fn parse_bandwidth(output: &str) -> Option<f64> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != TRANSFER_SIZE {
            return None;
        }
        fields.next().and_then(parse_f64)
    })
}

/// Node count from `numactl -H` (`available: 2 nodes (0-1)`).
pub fn parse_numa_nodes(output: &str) -> Option<usize> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("available:")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// NUMA node serving `gpu` when GPUs are spread evenly across nodes.
pub fn numa_node_for_gpu(gpu: usize, gpu_count: usize, numa_nodes: usize) -> usize {
    if gpu_count == 0 || numa_nodes <= 1 {
        return 0;
    }
    (gpu * numa_nodes / gpu_count).min(numa_nodes - 1)
}
