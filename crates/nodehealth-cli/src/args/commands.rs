use super::common::{InterfaceArgs, ThresholdArgs};
use crate::types::ShapeArg;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check NIC link health with mlxlink")]
    Link {
        #[command(flatten)]
        interfaces: InterfaceArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        #[arg(long, help = "Classify saved mlxlink JSON and snapshots from this directory")]
        from_dir: Option<PathBuf>,

        #[arg(long, help = "Address recorded in the report and used in its file name")]
        address: Option<String>,

        #[arg(long, help = "Report date stamp (default: now, YYYYmmddHHMMSS)")]
        date_stamp: Option<String>,

        #[arg(long, help = "Earlier report to diff failures against")]
        previous: Option<PathBuf>,

        #[arg(long, help = "Show only links that did not pass")]
        errors_only: bool,

        #[arg(long, help = "Order rows worst-first")]
        failures_first: bool,

        #[arg(long, help = "Keep each interface's raw mlxlink JSON")]
        save_raw: bool,
    },

    #[command(about = "Capture raw link state for offline classification")]
    Snapshot {
        #[command(flatten)]
        interfaces: InterfaceArgs,
    },

    #[command(about = "Check GPU ECC, row remaps, Xid errors, clock events and stress tests")]
    Gpu {
        #[arg(long, help = "Also run the host/device bandwidth test")]
        bandwidth: bool,

        #[arg(long, help = "bandwidthTest runs per GPU and direction")]
        iterations: Option<u32>,

        #[arg(long, help = "bandwidthTest binary")]
        bandwidth_binary: Option<PathBuf>,

        #[arg(long, help = "Also run gpu_burn on every GPU")]
        burn: bool,

        #[arg(long, help = "gpu-burn directory holding gpu_burn and compare.ptx")]
        burn_dir: Option<PathBuf>,

        #[arg(long, help = "gpu_burn duration in seconds")]
        burn_seconds: Option<u64>,

        #[arg(long, help = "Remapped uncorrectable rows above this fail the GPU")]
        remap_limit: Option<u64>,

        #[arg(long, help = "Report date stamp (default: now)")]
        date_stamp: Option<String>,
    },

    #[command(about = "Compare two link reports for new and recovered failures")]
    Diff {
        #[arg(help = "Earlier report (CSV or JSON)")]
        previous: PathBuf,

        #[arg(help = "Later report (CSV or JSON)")]
        current: PathBuf,

        #[arg(long, help = "Date stamp for the diff files (default: now)")]
        date_stamp: Option<String>,
    },

    #[command(about = "Run the link check on many hosts over SSH and merge the reports")]
    Fleet {
        #[arg(long, help = "File with one host or host pattern per line", conflicts_with = "hosts")]
        hostfile: Option<PathBuf>,

        #[arg(long, value_delimiter = ',', help = "Hosts or patterns such as gpu-[1-4]")]
        hosts: Vec<String>,

        #[arg(long, help = "SSH user")]
        user: Option<String>,

        #[arg(long, help = "SSH port")]
        port: Option<u16>,

        #[arg(long, help = "SSH private key")]
        identity: Option<PathBuf>,

        #[arg(long, help = "Working directory on each host")]
        remote_dir: Option<String>,

        #[arg(long, help = "Binary to copy (default: this executable)")]
        executable: Option<PathBuf>,

        #[arg(long, help = "Hosts contacted at once")]
        concurrency: Option<usize>,

        #[arg(long, help = "Report date stamp shared by all hosts (default: now)")]
        date_stamp: Option<String>,

        #[arg(last = true, help = "Extra arguments for the remote link check")]
        remote_args: Vec<String>,
    },

    #[command(about = "Measure osu_latency across rail interface pairs between two hosts")]
    RailLatency {
        #[arg(long)]
        client: String,

        #[arg(long)]
        server: String,

        #[arg(long)]
        shape: Option<ShapeArg>,

        #[arg(long, help = "Latency above this many microseconds fails a pair")]
        cutoff: Option<f64>,

        #[arg(long, help = "Directory holding osu_latency (default: $HPCX_OSU_CUDA_DIR)")]
        osu_dir: Option<PathBuf>,
    },

    #[command(about = "Verify RTTCC is disabled on every RDMA NIC")]
    Rttcc {
        #[command(flatten)]
        interfaces: InterfaceArgs,
    },

    #[command(about = "Verify PCI slots map to the expected RDMA device names")]
    Mapping,

    #[command(about = "Decode cluster, ToR, isolation and interface IDs from RDMA IPv6 addresses")]
    DecodeIpv6 {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    #[command(about = "Translate device names from a shape into H100 numbering")]
    Renumber {
        #[arg(long)]
        shape: ShapeArg,

        #[arg(required = true)]
        interfaces: Vec<String>,
    },

    #[command(about = "Show or create the config file")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Print the effective configuration")]
    Show,

    #[command(about = "Write the default configuration")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },

    #[command(about = "Print the config file path")]
    Path,
}
