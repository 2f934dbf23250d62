//! RDMA device discovery and NIC register reads:
//! `rdma link`, `mst status -v`, `ibdev2netdev -v` and `mlxreg` PPCC.

use nodehealth_core::CommandSpec;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

static RDMA_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(mlx5_\d+)/\d+ state (\w+) physical_state (\w+) netdev (\S+)").unwrap()
});
static MST_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\S+\s+\S+\s+((?:[0-9a-fA-F]{4}:)?[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.\d)\s+(mlx5_\d+)\s+\S+\s+-?\d+\s*$",
    )
    .unwrap()
});
static PCI_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{4}:)?[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.\d$").unwrap()
});

pub fn rdma_link_command() -> CommandSpec {
    CommandSpec::new("rdma").arg("link")
}

pub fn mst_status_command() -> CommandSpec {
    CommandSpec::new("mst").args(["status", "-v"]).sudo()
}

pub fn ibdev2netdev_command() -> CommandSpec {
    CommandSpec::new("ibdev2netdev").arg("-v")
}

/// Read the PPCC register whose value says whether RTTCC is on.
pub fn rttcc_command(device: &str, timeout: Duration) -> CommandSpec {
    CommandSpec::new("mlxreg")
        .args(["-d", device, "-y", "--get", "--reg_name=PPCC"])
        .arg("--indexes=local_port=1,pnat=0,lp_msb=0,algo_slot=0,algo_param_index=0")
        .timeout(timeout)
        .sudo()
}

/// netdev -> RDMA device from `rdma link`.
pub fn parse_rdma_link(output: &str) -> BTreeMap<String, String> {
    RDMA_LINK
        .captures_iter(output)
        .map(|caps| (caps[4].to_string(), caps[1].to_string()))
        .collect()
}

/// PCI address -> RDMA device from `mst status -v`.
pub fn parse_mst_status(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| MST_ROW.captures(line))
        .map(|caps| (caps[1].to_lowercase(), caps[2].to_string()))
        .collect()
}

/// PCI address -> RDMA device from `ibdev2netdev -v`.
pub fn parse_ibdev2netdev(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pci = parts.next()?;
            let device = parts.next()?;
            PCI_ADDR
                .is_match(pci)
                .then(|| (pci.to_lowercase(), device.to_string()))
        })
        .collect()
}

/// RTTCC state from an `mlxreg` PPCC dump; `None` when no value row was printed.
pub fn parse_rttcc(output: &str) -> Option<bool> {
    let values: Vec<&str> = output
        .lines()
        .map(str::trim_start)
        .filter(|l| l.starts_with("value"))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().any(|l| l.contains("0x00000001")))
}

/// Strip the PCI domain so `0000:0c:00.0` and `0c:00.0` compare equal.
pub fn short_pci(pci: &str) -> &str {
    if pci.matches(':').count() == 2 {
        pci.split_once(':').map(|(_, rest)| rest).unwrap_or(pci)
    } else {
        pci
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rdma_link() {
        let out = "\
link mlx5_0/1 state ACTIVE physical_state LINK_UP netdev eth2
link mlx5_1/1 state DOWN physical_state DISABLED netdev eth3
link mlx5_2/1 state ACTIVE physical_state LINK_UP
";
        let map = parse_rdma_link(out);
        assert_eq!(map.len(), 2);
        assert_eq!(map["eth2"], "mlx5_0");
        assert_eq!(map["eth3"], "mlx5_1");
    }

    #[test]
    fn test_parse_mst_status() {
        let out = "\
PCI devices:
------------
DEVICE_TYPE             MST                           PCI       RDMA            NET                                     NUMA
ConnectX7(rev:0)        /dev/mst/mt4129_pciconf0      0c:00.0   mlx5_0          net-eth2                                0
ConnectX7(rev:0)        /dev/mst/mt4129_pciconf0.1    0c:00.1   mlx5_1          net-eth3                                0
BlueField3(rev:1)       NA                            D5:00.1   mlx5_17         net-eth19                               1
";
        let map = parse_mst_status(out);
        assert_eq!(map.len(), 3);
        assert_eq!(map["0c:00.0"], "mlx5_0");
        assert_eq!(map["d5:00.1"], "mlx5_17");
    }

    #[test]
    fn test_parse_ibdev2netdev() {
        let out = "\
0000:0c:00.0 mlx5_0 (MT4129 - MCX75310AAS-NEAT) fw 28.39.2048 port 1 (ACTIVE) ==> eth2 (Up)
0000:1f:00.0 mlx5_2 (MT41692 - 900-9D3B6) fw 32.39.1002 port 1 (ACTIVE) ==> ens300np0 (Up)
garbage line
";
        let map = parse_ibdev2netdev(out);
        assert_eq!(map.len(), 2);
        assert_eq!(map["0000:1f:00.0"], "mlx5_2");
    }

    #[test]
    fn test_parse_rttcc() {
        assert_eq!(parse_rttcc("Field Name | Data\nvalue      | 0x00000001\n"), Some(true));
        assert_eq!(parse_rttcc("value      | 0x00000000\n"), Some(false));
        assert_eq!(parse_rttcc("-E- Failed to send access register\n"), None);
    }

    #[test]
    fn test_short_pci() {
        assert_eq!(short_pci("0000:0c:00.0"), "0c:00.0");
        assert_eq!(short_pci("0c:00.0"), "0c:00.0");
    }
}
