use crate::{Error, Result};
use nodehealth_core::pool::{HOST_POOL_SIZE, INTERFACE_POOL_SIZE};
use nodehealth_engine::fabric::DEFAULT_LATENCY_CUTOFF_US;
use nodehealth_engine::{ClassificationPolicy, FlapWindow, GpuThresholds, LinkThresholds};
use nodehealth_providers::Shape;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Resolve the config file path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. NODEHEALTH_CONFIG environment variable (with tilde expansion)
/// 3. XDG config directory
/// 4. ~/.nodehealth/config.toml
pub fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("NODEHEALTH_CONFIG") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("nodehealth").join("config.toml"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".nodehealth").join("config.toml"));
    }

    Err(Error::Config(
        "Could not determine config path: no HOME directory or XDG config directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub shape: Shape,
    /// Devices to check; empty means the shape's RDMA interfaces.
    pub interfaces: Vec<String>,
    /// With no explicit interfaces, check what `mst status` lists.
    pub discover: bool,
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Report interfaces in H100 numbering on other shapes.
    pub standardize: bool,
    /// Keep each interface's raw mlxlink JSON next to the report.
    pub save_raw: bool,
    pub policy: ClassificationPolicy,
    pub thresholds: LinkThresholds,
    pub flaps: FlapWindow,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            shape: Shape::H100,
            interfaces: Vec::new(),
            discover: false,
            concurrency: INTERFACE_POOL_SIZE,
            timeout_secs: 60,
            standardize: true,
            save_raw: false,
            policy: ClassificationPolicy::default(),
            thresholds: LinkThresholds::default(),
            flaps: FlapWindow::default(),
        }
    }
}

impl LinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured devices minus front-end slots, else the shape's RDMA
    /// interfaces.
    pub fn interfaces(&self) -> Vec<String> {
        if !self.interfaces.is_empty() {
            return self
                .interfaces
                .iter()
                .filter(|iface| {
                    let frontend = self.shape.is_frontend(iface);
                    if frontend {
                        warn!(
                            interface = %iface,
                            shape = %self.shape,
                            "skipping front-end interface"
                        );
                    }
                    !frontend
                })
                .cloned()
                .collect();
        }
        self.shape
            .rdma_interfaces()
            .into_iter()
            .map(nodehealth_providers::topology::interface_name)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Run the host/device bandwidth test. Needs idle GPUs.
    pub bandwidth: bool,
    pub bandwidth_binary: PathBuf,
    pub bandwidth_iterations: u32,
    /// Run gpu_burn on every GPU at once. Needs idle GPUs.
    pub burn: bool,
    /// gpu-burn checkout holding `gpu_burn` and `compare.ptx`.
    pub burn_dir: PathBuf,
    pub burn_seconds: u64,
    pub timeout_secs: u64,
    pub thresholds: GpuThresholds,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            bandwidth: false,
            bandwidth_binary: PathBuf::from(
                "/opt/oci-hpc/cuda-samples/bin/x86_64/linux/release/bandwidthTest",
            ),
            bandwidth_iterations: 1,
            burn: false,
            burn_dir: PathBuf::from("/opt/oci-hpc/gpu-burn"),
            burn_seconds: 15,
            timeout_secs: 60,
            thresholds: GpuThresholds::default(),
        }
    }
}

impl GpuConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Burn duration plus the usual command allowance.
    pub fn burn_timeout(&self) -> Duration {
        Duration::from_secs(self.burn_seconds + self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    pub mpirun: String,
    /// Directory holding `osu_latency`; falls back to `$HPCX_OSU_CUDA_DIR`.
    pub osu_dir: Option<PathBuf>,
    pub latency_cutoff_us: f64,
    pub timeout_secs: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            mpirun: "mpirun".to_string(),
            osu_dir: None,
            latency_cutoff_us: DEFAULT_LATENCY_CUTOFF_US,
            timeout_secs: 60,
        }
    }
}

impl FabricConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn osu_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.osu_dir {
            return Ok(dir.clone());
        }
        std::env::var_os("HPCX_OSU_CUDA_DIR")
            .map(PathBuf::from)
            .ok_or_else(|| {
                Error::Config("osu_dir is not set and HPCX_OSU_CUDA_DIR is empty".to_string())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
    /// Working directory created on every remote host.
    pub remote_dir: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            user: None,
            port: None,
            identity_file: None,
            remote_dir: "/tmp/nodehealth".to_string(),
            concurrency: HOST_POOL_SIZE,
            timeout_secs: nodehealth_core::exec::REMOTE_TIMEOUT.as_secs(),
        }
    }
}

impl FleetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    /// Order report rows worst-first instead of by host and interface.
    pub failures_first: bool,
    /// Exit with status 2 when any unit failed.
    pub exit_on_failure: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            failures_first: false,
            exit_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub gpu: GpuConfig,
    #[serde(default)]
    pub fabric: FabricConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
