//! Ordered threshold rules for link records.
//!
//! Rules run in a fixed order and each match produces a verdict. With the
//! default [`ClassificationPolicy::LastMatchWins`] the last matching rule
//! decides the status, so a later, milder rule can overwrite an earlier
//! failure. [`ClassificationPolicy::SeverityRanked`] keeps the most severe
//! match instead.

use nodehealth_types::{FEC_BIN_COUNT, LinkRecord, Status, UNKNOWN};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const ACTIVE: &str = "Active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkThresholds {
    /// Raw physical BER above this fails the link.
    pub ber_threshold: f64,
    /// Effective physical errors above this fail the link.
    pub eff_threshold: i64,
    /// First FEC bin that counts as the degraded tail.
    pub fec_bin_start: usize,
    /// Tail bin counts above this raise a warning.
    pub fec_bin_threshold: i64,
    pub min_firmware: Option<String>,
}

impl Default for LinkThresholds {
    fn default() -> Self {
        Self {
            ber_threshold: 1e-7,
            eff_threshold: 0,
            fec_bin_start: 7,
            fec_bin_threshold: 0,
            min_firmware: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    #[default]
    LastMatchWins,
    SeverityRanked,
}

impl fmt::Display for ClassificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationPolicy::LastMatchWins => write!(f, "last_match_wins"),
            ClassificationPolicy::SeverityRanked => write!(f, "severity_ranked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRule {
    LinkState,
    InterfaceMapping,
    FecTail,
    RawBer,
    EffectiveErrors,
    LinkFlaps,
    Firmware,
}

/// Evaluation order. Changing it changes last-match-wins results.
pub const RULE_ORDER: [LinkRule; 7] = [
    LinkRule::LinkState,
    LinkRule::InterfaceMapping,
    LinkRule::FecTail,
    LinkRule::RawBer,
    LinkRule::EffectiveErrors,
    LinkRule::LinkFlaps,
    LinkRule::Firmware,
];

impl LinkRule {
    /// Verdicts this rule produces for `record`, in evaluation order.
    pub fn matches(self, record: &LinkRecord, t: &LinkThresholds) -> Vec<Status> {
        match self {
            LinkRule::LinkState if record.link_state != ACTIVE => {
                vec![Status::failed(format!("LinkState = {}", record.link_state))]
            }
            LinkRule::InterfaceMapping
                if record.fec_histogram_supported && !record.fec_bins.is_reported() =>
            {
                vec![Status::failed("Check interface mapping")]
            }
            LinkRule::FecTail => (t.fec_bin_start..FEC_BIN_COUNT)
                .filter(|&bin| record.fec_bins.get(bin) > t.fec_bin_threshold)
                .map(|bin| Status::warning(format!("FecBin{} > {}", bin, t.fec_bin_threshold)))
                .collect(),
            LinkRule::RawBer if record.raw_phy_ber > t.ber_threshold => {
                vec![Status::failed(format!("RawPhyBER > {:e}", t.ber_threshold))]
            }
            LinkRule::EffectiveErrors if record.eff_phy_errs > t.eff_threshold => {
                vec![Status::failed(format!("EffPhyErrs > {}", t.eff_threshold))]
            }
            LinkRule::LinkFlaps if record.flap_count > 0 => {
                vec![Status::failed(format!("Link flaps = {}", record.flap_count))]
            }
            LinkRule::Firmware => match &t.min_firmware {
                Some(min)
                    if record.firmware_version != UNKNOWN
                        && compare_versions(&record.firmware_version, min) == Ordering::Less =>
                {
                    vec![Status::failed(format!(
                        "Firmware {} < {}",
                        record.firmware_version, min
                    ))]
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

/// Compare dotted numeric versions; non-numeric parts compare as 0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.trim()
            .split(['.', '-'])
            .map(|p| p.parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Status for one record. Pure: same inputs, same verdict.
pub fn classify(
    record: &LinkRecord,
    thresholds: &LinkThresholds,
    policy: ClassificationPolicy,
) -> Status {
    let verdicts = RULE_ORDER
        .iter()
        .flat_map(|rule| rule.matches(record, thresholds));

    match policy {
        ClassificationPolicy::LastMatchWins => verdicts.last().unwrap_or_default(),
        ClassificationPolicy::SeverityRanked => verdicts.fold(Status::Passed, Status::worst),
    }
}

pub fn classify_all(
    records: &mut [LinkRecord],
    thresholds: &LinkThresholds,
    policy: ClassificationPolicy,
) {
    for record in records.iter_mut() {
        record.status = classify(record, thresholds, policy);
    }
}
