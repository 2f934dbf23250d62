use crate::types::{PolicyArg, ShapeArg};
use clap::Args;
use nodehealth_runtime::LinkConfig;

/// Which interfaces to look at and how hard to push.
#[derive(Debug, Clone, Default, Args)]
pub struct InterfaceArgs {
    #[arg(long, help = "Machine shape whose NIC layout applies")]
    pub shape: Option<ShapeArg>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated RDMA devices (default: the shape's RDMA interfaces)"
    )]
    pub interfaces: Vec<String>,

    #[arg(long, help = "Check the devices `mst status` lists")]
    pub discover: bool,

    #[arg(long, help = "Interfaces collected at once")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Per-interface timeout in seconds")]
    pub timeout: Option<u64>,
}

impl InterfaceArgs {
    pub fn apply(&self, config: &mut LinkConfig) {
        if let Some(shape) = self.shape {
            config.shape = shape.into();
        }
        if !self.interfaces.is_empty() {
            config.interfaces = self.interfaces.clone();
        }
        if self.discover {
            config.discover = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ThresholdArgs {
    #[arg(long, help = "Raw physical BER above this fails the link")]
    pub ber_threshold: Option<f64>,

    #[arg(long, help = "Effective physical errors above this fail the link")]
    pub eff_threshold: Option<i64>,

    #[arg(long, help = "First FEC histogram bin that counts as a degrading tail")]
    pub fec_bin_start: Option<usize>,

    #[arg(long, help = "Tail bin counts above this warn")]
    pub fec_bin_threshold: Option<i64>,

    #[arg(long, help = "Only link-down events this many seconds old or newer count")]
    pub flap_window: Option<i64>,

    #[arg(long, help = "Ignore link-down events this many seconds after boot")]
    pub flap_grace: Option<i64>,

    #[arg(long, help = "Firmware older than this fails the link")]
    pub min_firmware: Option<String>,

    #[arg(long, help = "How multiple rule matches combine")]
    pub policy: Option<PolicyArg>,
}

impl ThresholdArgs {
    pub fn apply(&self, config: &mut LinkConfig) {
        let t = &mut config.thresholds;
        if let Some(v) = self.ber_threshold {
            t.ber_threshold = v;
        }
        if let Some(v) = self.eff_threshold {
            t.eff_threshold = v;
        }
        if let Some(v) = self.fec_bin_start {
            t.fec_bin_start = v;
        }
        if let Some(v) = self.fec_bin_threshold {
            t.fec_bin_threshold = v;
        }
        if let Some(v) = &self.min_firmware {
            t.min_firmware = Some(v.clone());
        }
        if let Some(v) = self.flap_window {
            config.flaps.window_secs = v;
        }
        if let Some(v) = self.flap_grace {
            config.flaps.grace_secs = v;
        }
        if let Some(policy) = self.policy {
            config.policy = policy.into();
        }
    }
}
