use crate::link::MISSING_F64;
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Host/device copy bandwidth samples for one GPU, in GB/s.
///
/// A failed iteration is stored as [`MISSING_F64`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthRecord {
    pub gpu: usize,
    pub numa_node: usize,
    pub htod: Vec<f64>,
    pub dtoh: Vec<f64>,
    pub status: Status,
}

impl BandwidthRecord {
    pub fn new(gpu: usize, numa_node: usize) -> Self {
        Self {
            gpu,
            numa_node,
            htod: Vec::new(),
            dtoh: Vec::new(),
            status: Status::Passed,
        }
    }

    pub fn htod_mean(&self) -> f64 {
        mean(&self.htod)
    }

    pub fn dtoh_mean(&self) -> f64 {
        mean(&self.dtoh)
    }
}

/// Mean of the valid samples, or the sentinel when none succeeded.
fn mean(samples: &[f64]) -> f64 {
    let valid: Vec<f64> = samples.iter().copied().filter(|v| *v >= 0.0).collect();
    if valid.is_empty() {
        return MISSING_F64;
    }
    valid.iter().sum::<f64>() / valid.len() as f64
}
