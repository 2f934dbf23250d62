use nodehealth_runtime::{GpuCheck, GpuConfig};
use nodehealth_testing::{SampleFiles, ScriptedRunner};
use nodehealth_types::{GpuCheckKind, HostIdentity, MISSING_F64, Severity, Status};

const GPU_LIST: &str = "\
GPU 0: NVIDIA H100 80GB HBM3 (UUID: GPU-0a)
GPU 1: NVIDIA H100 80GB HBM3 (UUID: GPU-1b)
";

const BANDWIDTH_OK: &str = "\
 Host to Device Bandwidth, 1 Device(s)
 PINNED Memory Transfers
   Transfer Size (Bytes)\tBandwidth(GB/s)
   32000000\t\t\t55.2

Result = PASS
";

const BANDWIDTH_SLOW: &str = "\
   Transfer Size (Bytes)\tBandwidth(GB/s)
   32000000\t\t\t40.0
";

fn identity() -> HostIdentity {
    HostIdentity {
        hostname: "gpu-1".to_string(),
        serial: "SN1".to_string(),
    }
}

fn host_runner() -> ScriptedRunner {
    let samples = SampleFiles::new();
    ScriptedRunner::new()
        .on_stdout("nvidia-smi -L", GPU_LIST)
        .on_stdout("nvidia-smi -q -d PIDS", "Processes                          : None\n")
        .on_stdout("nvidia-smi -q", samples.read("nvidia_smi_ecc_volatile.txt").unwrap())
        .on_stdout("nvidia-smi --query-remapped-rows", samples.read("remapped_rows.csv").unwrap())
        .on_stdout("dmesg -T", samples.read("dmesg.log").unwrap())
        .on_stdout(
            "nvidia-smi --query-gpu=clocks_event_reasons.active",
            "0x0000000000000001\n0x0000000000000008\n",
        )
}

#[tokio::test]
async fn all_checks_report_issues() {
    let runner = host_runner();
    let config = GpuConfig::default();
    let report = GpuCheck::new(&runner, &config).run(&identity()).await;

    assert_eq!(
        report.checks_run,
        vec![
            GpuCheckKind::Ecc,
            GpuCheckKind::RowRemap,
            GpuCheckKind::Xid,
            GpuCheckKind::Throttle
        ]
    );
    assert!(report.skipped.is_empty());

    let ecc: Vec<_> = report.issues_for(GpuCheckKind::Ecc).collect();
    assert_eq!(ecc.len(), 1);
    assert_eq!(ecc[0].message, "Volatile DRAM Uncorrectable: 2");

    let remap: Vec<(&str, Severity)> = report
        .issues_for(GpuCheckKind::RowRemap)
        .map(|i| (i.device.as_str(), i.severity))
        .collect();
    assert_eq!(
        remap,
        vec![
            ("GPU 2", Severity::Failed),
            ("GPU 3", Severity::Warning),
            ("GPU 6", Severity::Failed)
        ]
    );

    let xid: Vec<_> = report.issues_for(GpuCheckKind::Xid).collect();
    assert_eq!(xid.len(), 2);
    assert!(xid.iter().any(|i| i.message == "Xid 94 x2: Contained ECC error"));

    let throttle: Vec<_> = report.issues_for(GpuCheckKind::Throttle).collect();
    assert_eq!(throttle.len(), 1);
    assert_eq!(throttle[0].device, "GPU 1");

    assert!(report.status.is_failed());
    assert!(!runner.was_called("numactl"));
}

#[tokio::test]
async fn missing_nvidia_smi_skips_checks() {
    let runner = ScriptedRunner::new();
    let config = GpuConfig::default();
    let report = GpuCheck::new(&runner, &config).run(&identity()).await;

    assert!(report.checks_run.is_empty());
    assert_eq!(report.skipped.len(), 4);
    assert!(report.issues.is_empty());
    assert_eq!(report.status, Status::Passed);
}

#[tokio::test]
async fn bandwidth_runs_per_gpu_on_its_numa_node() {
    let runner = ScriptedRunner::new()
        .on_stdout("nvidia-smi -L", GPU_LIST)
        .on_stdout("nvidia-smi -q -d PIDS", "Processes                          : None\n")
        .on_stdout("numactl -H", "available: 2 nodes (0-1)\n")
        .on_stdout("numactl -N0 -m0", BANDWIDTH_OK)
        .on_stdout("numactl -N1 -m1 /opt/bw --htod", BANDWIDTH_SLOW)
        .on_stdout("numactl -N1 -m1 /opt/bw --dtoh", "");
    let config = GpuConfig {
        bandwidth: true,
        bandwidth_binary: "/opt/bw".into(),
        bandwidth_iterations: 2,
        ..GpuConfig::default()
    };

    let report = GpuCheck::new(&runner, &config).run(&identity()).await;

    assert!(report.checks_run.contains(&GpuCheckKind::Bandwidth));
    assert_eq!(report.bandwidth.len(), 2);

    let gpu0 = &report.bandwidth[0];
    assert_eq!(gpu0.numa_node, 0);
    assert_eq!(gpu0.htod, vec![55.2, 55.2]);
    assert!(gpu0.status.is_passed());

    let gpu1 = &report.bandwidth[1];
    assert_eq!(gpu1.numa_node, 1);
    assert_eq!(gpu1.dtoh, vec![MISSING_F64, MISSING_F64]);
    assert!(gpu1.status.is_failed());

    let issues: Vec<_> = report.issues_for(GpuCheckKind::Bandwidth).collect();
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|i| i.device == "GPU 1"));
}

#[tokio::test]
async fn busy_gpus_skip_bandwidth() {
    let runner = ScriptedRunner::new()
        .on_stdout("nvidia-smi -L", GPU_LIST)
        .on_stdout(
            "nvidia-smi -q -d PIDS",
            "Processes\n    Process ID                    : 4242\n",
        );
    let config = GpuConfig {
        bandwidth: true,
        ..GpuConfig::default()
    };

    let report = GpuCheck::new(&runner, &config).run(&identity()).await;
    assert!(report.bandwidth.is_empty());
    let issues: Vec<_> = report.issues_for(GpuCheckKind::Bandwidth).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].device, "all");
    assert!(report.status.is_failed());
    assert!(!runner.was_called("numactl"));
}

#[tokio::test]
async fn burn_runs_every_gpu() {
    let samples = SampleFiles::new();
    let runner = ScriptedRunner::new()
        .on_stdout("nvidia-smi -L", GPU_LIST)
        .on_stdout("nvidia-smi -q -d PIDS", "Processes                          : None\n")
        .on_stdout("/opt/burn/gpu_burn -i 0 ", samples.read("gpu_burn.log").unwrap())
        .on_stdout(
            "/opt/burn/gpu_burn -i 1 ",
            "100.0%  proc'd: 900 (21000 Gflop/s)   errors: 3   temps: 85 C\n\tGPU 0: FAULTY\n",
        );
    let config = GpuConfig {
        burn: true,
        burn_dir: "/opt/burn".into(),
        ..GpuConfig::default()
    };

    let report = GpuCheck::new(&runner, &config).run(&identity()).await;

    assert!(report.checks_run.contains(&GpuCheckKind::Burn));
    assert!(runner.was_called("/opt/burn/gpu_burn -i 1 -d -stts 1 -c /opt/burn/compare.ptx 15"));
    assert_eq!(report.burn.len(), 2);
    assert_eq!(report.burn[0].max_gflops, 53102.0);
    assert!(report.burn[0].status.is_passed());
    assert!(report.burn[1].faulty);
    assert!(report.burn[1].status.is_failed());

    let issues: Vec<_> = report.issues_for(GpuCheckKind::Burn).collect();
    assert_eq!(issues.len(), 3);
    assert!(issues.iter().all(|i| i.device == "GPU 1"));
    assert!(report.status.is_failed());
}

#[tokio::test]
async fn busy_gpus_skip_burn() {
    let runner = ScriptedRunner::new()
        .on_stdout("nvidia-smi -L", GPU_LIST)
        .on_stdout(
            "nvidia-smi -q -d PIDS",
            "Processes\n    Process ID                    : 4242\n",
        );
    let config = GpuConfig {
        burn: true,
        ..GpuConfig::default()
    };

    let report = GpuCheck::new(&runner, &config).run(&identity()).await;
    assert!(report.burn.is_empty());
    let issues: Vec<_> = report.issues_for(GpuCheckKind::Burn).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].message, "burn test did not run: GPUs have running processes");
    assert!(!runner.was_called("/opt/oci-hpc/gpu-burn/gpu_burn"));
}
