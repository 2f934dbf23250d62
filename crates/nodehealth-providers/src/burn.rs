//! `gpu_burn` stress runs, one GPU per invocation.

use crate::value::parse_f64;
use nodehealth_core::CommandSpec;
use nodehealth_types::BurnRecord;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+%.*?(\d+) Gflop/s").unwrap());
static ERRORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"errors: (\d+)").unwrap());
static TEMPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"temps: (\d+) C").unwrap());
static VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*GPU \d+: (OK|FAULTY)").unwrap());

/// `gpu_burn -i <gpu> -d -stts 1 -c <dir>/compare.ptx <seconds>` from the
/// gpu-burn checkout at `dir`.
pub fn command(dir: &Path, gpu: usize, seconds: u64, timeout: Duration) -> CommandSpec {
    CommandSpec::new(dir.join("gpu_burn").display().to_string())
        .args(["-i".to_string(), gpu.to_string(), "-d".to_string()])
        .args(["-stts", "1", "-c"])
        .arg(dir.join("compare.ptx").display().to_string())
        .arg(seconds.to_string())
        .timeout(timeout)
}

/// Peak Gflop/s, temperature and error count over the progress lines, plus
/// the closing verdict.
pub fn parse_burn(gpu: usize, output: &str) -> BurnRecord {
    let mut record = BurnRecord::new(gpu);
    for line in output.lines() {
        if let Some(caps) = VERDICT.captures(line) {
            record.faulty |= &caps[1] == "FAULTY";
            continue;
        }
        let Some(caps) = PROGRESS.captures(line) else {
            continue;
        };
        if let Some(gflops) = parse_f64(&caps[1]) {
            record.max_gflops = record.max_gflops.max(gflops);
        }
        if let Some(errors) = ERRORS.captures(line).and_then(|c| c[1].parse::<i64>().ok()) {
            record.errors = record.errors.max(errors);
        }
        if let Some(temp) = TEMPS.captures(line).and_then(|c| c[1].parse::<i64>().ok()) {
            record.max_temp_c = record.max_temp_c.max(temp);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodehealth_types::{MISSING, MISSING_F64};

    #[test]
    fn test_command_layout() {
        let spec = command(Path::new("/opt/oci-hpc/gpu-burn"), 3, 15, Duration::from_secs(75));
        assert_eq!(
            spec.display(),
            "/opt/oci-hpc/gpu-burn/gpu_burn -i 3 -d -stts 1 -c /opt/oci-hpc/gpu-burn/compare.ptx 15"
        );
        assert_eq!(spec.timeout, Duration::from_secs(75));
    }

    #[test]
    fn test_parse_faulty_run() {
        let output = "\
50.0%  proc'd: 1200 (41000 Gflop/s)   errors: 0   temps: 71 C
100.0%  proc'd: 2400 (39000 Gflop/s)   errors: 12   temps: 83 C

Tested 1 GPUs:
\tGPU 0: FAULTY
";
        let record = parse_burn(5, output);
        assert_eq!(record.gpu, 5);
        assert_eq!(record.max_gflops, 41000.0);
        assert_eq!(record.max_temp_c, 83);
        assert_eq!(record.errors, 12);
        assert!(record.faulty);
    }

    #[test]
    fn test_parse_without_progress() {
        let record = parse_burn(0, "Couldn't init a GPU test: CUDA_ERROR_NO_DEVICE\n");
        assert!(!record.has_samples());
        assert_eq!(record.max_gflops, MISSING_F64);
        assert_eq!(record.max_temp_c, MISSING);
        assert!(!record.faulty);
    }
}
