//! NIC fabric checks: RTTCC state, PCI-to-device mapping and rail latency.

use crate::config::FabricConfig;
use crate::error::Result;
use nodehealth_core::{CommandRunner, natural_cmp, run_bounded};
use nodehealth_engine::fabric::{latency_record, mapping_verdicts, rttcc_verdict};
use nodehealth_providers::latency::{self, Endpoint};
use nodehealth_providers::topology::interface_name;
use nodehealth_providers::{Shape, rdma};
use nodehealth_types::{LatencyRecord, MappingRecord, RttccRecord};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Read the PPCC register of every device, `concurrency` at a time.
pub async fn rttcc(
    runner: &dyn CommandRunner,
    config: &FabricConfig,
    devices: &[String],
    concurrency: usize,
) -> Vec<RttccRecord> {
    let timeout = config.timeout();
    let mut records = run_bounded(devices.iter(), concurrency, |device| async move {
        let output = runner.run(&rdma::rttcc_command(device, timeout)).await;
        if !output.success() {
            warn!(
                interface = %device,
                reason = %output.failure_reason().unwrap_or_default(),
                "could not read PPCC register"
            );
        }
        rttcc_verdict(device, rdma::parse_rttcc(&output.stdout))
    })
    .await;
    records.sort_by(|a, b| natural_cmp(&a.interface, &b.interface));
    records
}

/// PCI address -> RDMA device as the host reports it.
///
/// Falls back to `ibdev2netdev -v` when `mst status` lists nothing.
pub async fn observed_mapping(runner: &dyn CommandRunner) -> BTreeMap<String, String> {
    let mst = runner.run(&rdma::mst_status_command()).await;
    let mapping = rdma::parse_mst_status(&mst.stdout);
    if !mapping.is_empty() {
        return mapping;
    }
    warn!(reason = ?mst.failure_reason(), "mst status listed no devices; trying ibdev2netdev");
    let ib = runner.run(&rdma::ibdev2netdev_command()).await;
    rdma::parse_ibdev2netdev(&ib.stdout)
}

pub async fn mapping(runner: &dyn CommandRunner) -> Vec<MappingRecord> {
    let observed = observed_mapping(runner).await;
    debug!(devices = observed.len(), "checking device mapping");
    mapping_verdicts(&observed)
}

/// Run the shape's rail test plan between two hosts.
///
/// Runs are sequential so measurements do not disturb each other.
pub async fn rail_latency(
    runner: &dyn CommandRunner,
    config: &FabricConfig,
    shape: Shape,
    client: &str,
    server: &str,
) -> Result<Vec<LatencyRecord>> {
    let osu_dir = config.osu_dir()?;
    let layout = shape.rail_layout();
    let plan = layout.test_plan();
    info!(client, server, runs = plan.len(), "running rail latency plan");

    let mut records = Vec::with_capacity(plan.len());
    for (client_if, server_if) in plan {
        let client_end = Endpoint {
            host: client,
            interface: client_if,
            numa_node: layout.numa_node(client_if),
        };
        let server_end = Endpoint {
            host: server,
            interface: server_if,
            numa_node: layout.numa_node(server_if),
        };
        let spec = latency::command(
            &config.mpirun,
            &osu_dir,
            &client_end,
            &server_end,
            config.timeout(),
        );
        let output = runner.run(&spec).await;
        let latency_us = latency::parse_latency(&output.stdout);
        if latency_us.is_none() {
            warn!(
                client_if,
                server_if,
                reason = %output.failure_reason().unwrap_or_else(|| "no 8-byte row".to_string()),
                "latency run produced no result"
            );
        }

        let (client_name, server_name) = (interface_name(client_if), interface_name(server_if));
        records.push(latency_record(
            (client, &client_name),
            (server, &server_name),
            latency_us,
            config.latency_cutoff_us,
        ));
    }
    Ok(records)
}
