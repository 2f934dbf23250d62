//! Per-shape NIC layouts.
//!
//! Machine shapes number their RDMA devices differently for the same PCI
//! slots. Reports are normalized to the H100 numbering so cabling records
//! line up across shapes.

use crate::error::{Error, Result};
use crate::rdma::short_pci;
use nodehealth_types::Ipv6Fields;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    H100,
    H100T,
    H200,
    A100,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::H100 => write!(f, "h100"),
            Shape::H100T => write!(f, "h100t"),
            Shape::H200 => write!(f, "h200"),
            Shape::A100 => write!(f, "a100"),
        }
    }
}

impl FromStr for Shape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "h100" => Ok(Shape::H100),
            "h100t" => Ok(Shape::H100T),
            "h200" => Ok(Shape::H200),
            "a100" => Ok(Shape::A100),
            _ => Err(Error::UnknownShape(s.to_string())),
        }
    }
}

/// (PCI, device index) as reported by `mst status` on an H100 host.
const H100_SLOTS: &[(&str, u32)] = &[
    ("0c:00.0", 0),
    ("0c:00.1", 1),
    ("1f:00.0", 2),
    ("2a:00.0", 3),
    ("2a:00.1", 4),
    ("41:00.0", 5),
    ("41:00.1", 6),
    ("58:00.0", 7),
    ("58:00.1", 8),
    ("86:00.0", 9),
    ("86:00.1", 10),
    ("9a:00.0", 11),
    ("a5:00.0", 12),
    ("a5:00.1", 13),
    ("bd:00.0", 14),
    ("bd:00.1", 15),
    ("d5:00.0", 16),
    ("d5:00.1", 17),
];

const H100T_SLOTS: &[(&str, u32)] = &[
    ("0c:00.0", 0),
    ("0c:00.1", 1),
    ("1f:00.0", 2),
    ("1f:00.1", 3),
    ("2a:00.0", 4),
    ("2a:00.1", 5),
    ("41:00.0", 6),
    ("41:00.1", 7),
    ("58:00.0", 8),
    ("58:00.1", 9),
    ("86:00.0", 10),
    ("86:00.1", 11),
    ("9a:00.0", 12),
    ("9a:00.1", 13),
    ("a5:00.0", 14),
    ("a5:00.1", 15),
    ("bd:00.0", 16),
    ("bd:00.1", 17),
    ("d5:00.0", 18),
    ("d5:00.1", 19),
];

const H200_SLOTS: &[(&str, u32)] = &[
    ("0c:00.0", 0),
    ("1f:00.0", 1),
    ("1f:00.1", 2),
    ("2a:00.0", 3),
    ("41:00.0", 4),
    ("58:00.0", 5),
    ("86:00.0", 6),
    ("9a:00.0", 7),
    ("9a:00.1", 8),
    ("a5:00.0", 9),
    ("bd:00.0", 10),
    ("d5:00.0", 11),
];

/// Front-end (non-RDMA) PCI slots, excluded from link checks.
const FRONTEND_SLOTS: &[&str] = &["1f:00.0", "1f:00.1", "9a:00.0", "9a:00.1"];

/// Device names an H100 may legitimately show for each PCI slot.
const H100_EXPECTED_DEVICES: &[(&str, &[u32])] = &[
    ("0c:00.0", &[0, 18]),
    ("0c:00.1", &[1, 19]),
    ("1f:00.0", &[2]),
    ("2a:00.0", &[3, 26]),
    ("2a:00.1", &[4, 27]),
    ("41:00.0", &[5, 28]),
    ("41:00.1", &[6, 29]),
    ("58:00.0", &[7, 30]),
    ("58:00.1", &[8, 31]),
    ("86:00.0", &[9, 32]),
    ("86:00.1", &[10, 33]),
    ("9a:00.0", &[11]),
    ("a5:00.0", &[12, 20]),
    ("a5:00.1", &[13, 21]),
    ("bd:00.0", &[14, 22]),
    ("bd:00.1", &[15, 23]),
    ("d5:00.0", &[16, 24]),
    ("d5:00.1", &[17, 25]),
];

/// Interfaces that pair up for rail latency runs, and their NUMA placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailLayout {
    pub pairs: Vec<Vec<u32>>,
    pub numa: Vec<(u32, Vec<u32>)>,
}

impl RailLayout {
    pub fn numa_node(&self, interface: u32) -> u32 {
        self.numa
            .iter()
            .find(|(_, ifaces)| ifaces.contains(&interface))
            .map(|(node, _)| *node)
            .unwrap_or(0)
    }

    /// Each interface against itself, then each pair crosswise.
    pub fn test_plan(&self) -> Vec<(u32, u32)> {
        let mut plan = Vec::new();
        for group in &self.pairs {
            plan.extend(group.iter().map(|&d| (d, d)));
            if let [a, b] = group.as_slice() {
                plan.push((*a, *b));
            }
        }
        plan
    }
}

impl Shape {
    fn slots(self) -> &'static [(&'static str, u32)] {
        match self {
            Shape::H100 | Shape::A100 => H100_SLOTS,
            Shape::H100T => H100T_SLOTS,
            Shape::H200 => H200_SLOTS,
        }
    }

    /// RDMA interface indices checked by default.
    pub fn rdma_interfaces(self) -> Vec<u32> {
        match self {
            Shape::A100 => (1..=12).chain(14..=17).collect(),
            _ => self
                .slots()
                .iter()
                .filter(|(pci, _)| !FRONTEND_SLOTS.contains(pci))
                .map(|(_, idx)| *idx)
                .collect(),
        }
    }

    /// Whether `interface` sits in a front-end slot under this shape's
    /// numbering. A100 hosts have no front-end NICs in the slot table.
    pub fn is_frontend(self, interface: &str) -> bool {
        if self == Shape::A100 {
            return false;
        }
        interface_index(interface)
            .and_then(|idx| self.pci_for(idx))
            .is_some_and(is_frontend_pci)
    }

    pub fn pci_for(self, interface: u32) -> Option<&'static str> {
        self.slots()
            .iter()
            .find(|(_, idx)| *idx == interface)
            .map(|(pci, _)| *pci)
    }

    pub fn rail_layout(self) -> RailLayout {
        match self {
            Shape::A100 => RailLayout {
                pairs: self.rdma_interfaces().into_iter().map(|d| vec![d]).collect(),
                numa: Vec::new(),
            },
            _ => RailLayout {
                pairs: vec![
                    vec![0, 1],
                    vec![3, 4],
                    vec![5, 6],
                    vec![7, 8],
                    vec![9, 10],
                    vec![12, 13],
                    vec![14, 15],
                    vec![16, 17],
                ],
                numa: vec![
                    (0, vec![0, 1, 3, 4, 5, 6, 7, 8]),
                    (1, vec![9, 10, 12, 13, 14, 15, 16, 17]),
                ],
            },
        }
    }
}

/// Whether a PCI address (with or without domain) is a front-end slot.
pub fn is_frontend_pci(pci: &str) -> bool {
    let pci = short_pci(pci).to_ascii_lowercase();
    FRONTEND_SLOTS.contains(&pci.as_str())
}

/// Parse `mlx5_7` or `7` into the device index.
pub fn interface_index(interface: &str) -> Option<u32> {
    interface
        .strip_prefix("mlx5_")
        .unwrap_or(interface)
        .parse()
        .ok()
}

pub fn interface_name(index: u32) -> String {
    format!("mlx5_{}", index)
}

/// Renumber an interface from `shape` into H100 numbering via its PCI slot.
pub fn standardize_interface(shape: Shape, interface: &str) -> Option<String> {
    let index = interface_index(interface)?;
    let pci = shape.pci_for(index)?;
    Shape::H100
        .slots()
        .iter()
        .find(|(slot, _)| *slot == pci)
        .map(|(_, idx)| interface_name(*idx))
}

/// Devices an H100 may show at `pci`; empty when the slot is not expected.
pub fn expected_devices(pci: &str) -> Vec<String> {
    let pci = short_pci(pci).to_ascii_lowercase();
    H100_EXPECTED_DEVICES
        .iter()
        .find(|(slot, _)| *slot == pci)
        .map(|(_, devs)| devs.iter().map(|&d| interface_name(d)).collect())
        .unwrap_or_default()
}

/// Decode the cluster/ToR/isolation/interface fields of an RDMA address.
pub fn decode_ipv6(addr: &Ipv6Addr) -> Ipv6Fields {
    let upper = (u128::from(*addr) >> 64) as u64;
    Ipv6Fields {
        cluster_id: ((upper >> 36) & 0xFFF_FFFF) as u32,
        tor_id: ((upper >> 24) & 0xFFF) as u16,
        isolation_id: ((upper >> 12) & 0xFFF) as u16,
        interface_id: (upper & 0xFFF) as u16,
    }
}

/// Parse and decode a textual address, e.g. from `ip -6 addr`.
pub fn parse_ipv6(text: &str) -> Result<Ipv6Fields> {
    let addr = text
        .trim()
        .split('/')
        .next()
        .unwrap_or_default()
        .parse::<Ipv6Addr>()
        .map_err(|err| Error::Parse(format!("{}: {}", text.trim(), err)))?;
    Ok(decode_ipv6(&addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h100_rdma_interfaces() {
        assert_eq!(
            Shape::H100.rdma_interfaces(),
            vec![0, 1, 3, 4, 5, 6, 7, 8, 9, 10, 12, 13, 14, 15, 16, 17]
        );
        assert_eq!(Shape::H200.rdma_interfaces(), vec![0, 3, 4, 5, 6, 9, 10, 11]);
        assert_eq!(Shape::A100.rdma_interfaces().len(), 16);
    }

    #[test]
    fn test_standardize_h100t() {
        assert_eq!(standardize_interface(Shape::H100T, "mlx5_4").as_deref(), Some("mlx5_3"));
        assert_eq!(standardize_interface(Shape::H100T, "19").as_deref(), Some("mlx5_17"));
        // 9a:00.1 has no H100 counterpart
        assert_eq!(standardize_interface(Shape::H100T, "mlx5_13"), None);
        assert_eq!(standardize_interface(Shape::H100, "mlx5_9").as_deref(), Some("mlx5_9"));
    }

    #[test]
    fn test_frontend_slots() {
        assert!(Shape::H100T.is_frontend("mlx5_3"));
        assert!(Shape::H100T.is_frontend("mlx5_13"));
        assert!(!Shape::H100T.is_frontend("mlx5_4"));
        assert!(Shape::H200.is_frontend("mlx5_2"));
        assert!(!Shape::A100.is_frontend("mlx5_2"));
        assert!(is_frontend_pci("0000:1F:00.0"));
        assert!(!is_frontend_pci("0c:00.0"));
    }

    #[test]
    fn test_expected_devices() {
        assert_eq!(expected_devices("0000:0c:00.0"), vec!["mlx5_0", "mlx5_18"]);
        assert!(expected_devices("0000:ff:00.0").is_empty());
    }

    #[test]
    fn test_rail_plan() {
        let layout = Shape::H100.rail_layout();
        let plan = layout.test_plan();
        assert_eq!(&plan[..3], &[(0, 0), (1, 1), (0, 1)]);
        assert_eq!(plan.len(), 24);
        assert_eq!(layout.numa_node(12), 1);
        assert_eq!(Shape::A100.rail_layout().test_plan().len(), 16);
    }

    #[test]
    fn test_decode_ipv6() {
        // cluster 0x1234567, tor 0x89a, isolation 0xbcd, interface 0xef0
        let addr: Ipv6Addr = "1234:5678:9abc:def0::1".parse().unwrap();
        let fields = decode_ipv6(&addr);
        assert_eq!(fields.cluster_id, 0x1234567);
        assert_eq!(fields.tor_id, 0x89a);
        assert_eq!(fields.isolation_id, 0xbcd);
        assert_eq!(fields.interface_id, 0xef0);
    }

    #[test]
    fn test_parse_ipv6_with_prefix() {
        let fields = parse_ipv6("1234:5678:9abc:def0::1/64").unwrap();
        assert_eq!(fields.tor_id, 0x89a);
        assert!(matches!(parse_ipv6("10.0.0.1"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_shape_parse() {
        assert_eq!("H100T".parse::<Shape>().unwrap(), Shape::H100T);
        assert!("b200".parse::<Shape>().is_err());
    }
}
