use crate::link::{MISSING, MISSING_F64};
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Peak readings from one `gpu_burn` run on a single GPU.
///
/// Fields stay at their sentinels when the run printed no progress line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub gpu: usize,
    pub max_gflops: f64,
    pub max_temp_c: i64,
    /// Highest compare error count seen in a progress line.
    pub errors: i64,
    /// gpu_burn's own verdict line said FAULTY.
    pub faulty: bool,
    pub status: Status,
}

impl BurnRecord {
    pub fn new(gpu: usize) -> Self {
        Self {
            gpu,
            max_gflops: MISSING_F64,
            max_temp_c: MISSING,
            errors: MISSING,
            faulty: false,
            status: Status::Passed,
        }
    }

    pub fn has_samples(&self) -> bool {
        self.max_gflops != MISSING_F64
    }
}
