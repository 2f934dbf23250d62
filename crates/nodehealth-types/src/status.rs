use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Verdict severity, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Passed,
    Warning,
    Failed,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Passed => write!(f, "passed"),
            Severity::Warning => write!(f, "warning"),
            Severity::Failed => write!(f, "failed"),
        }
    }
}

/// Per-unit verdict.
///
/// Rendered as `Passed`, `Warning - <reason>` or `Failed - <reason>`. The
/// rendered string is the value written to reports and compared across runs,
/// so `Display` and `FromStr` must stay inverse to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Passed,
    Warning(String),
    Failed(String),
}

impl Status {
    pub fn warning(reason: impl Into<String>) -> Self {
        Status::Warning(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Status::Failed(reason.into())
    }

    pub fn severity(&self) -> Severity {
        match self {
            Status::Passed => Severity::Passed,
            Status::Warning(_) => Severity::Warning,
            Status::Failed(_) => Severity::Failed,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Status::Passed => None,
            Status::Warning(r) | Status::Failed(r) => Some(r),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Status::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Status::Failed(_))
    }

    /// Keep whichever of the two verdicts is more severe; `other` wins ties.
    pub fn worst(self, other: Status) -> Status {
        if other.severity() >= self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "Passed"),
            Status::Warning(r) if r.is_empty() => write!(f, "Warning"),
            Status::Warning(r) => write!(f, "Warning - {}", r),
            Status::Failed(r) if r.is_empty() => write!(f, "Failed"),
            Status::Failed(r) => write!(f, "Failed - {}", r),
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "Passed" || s == "Pass" {
            return Ok(Status::Passed);
        }

        // Older reports used the short verdicts and "Watch" for warnings.
        for (prefix, failed) in [
            ("Failed", true),
            ("Fail", true),
            ("Warning", false),
            ("Watch", false),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                let reason = match rest.strip_prefix(" - ") {
                    Some(reason) => reason.to_string(),
                    None if rest.is_empty() => String::new(),
                    None => continue,
                };
                return Ok(if failed {
                    Status::Failed(reason)
                } else {
                    Status::Warning(reason)
                });
            }
        }

        Err(Error::InvalidStatus(s.to_string()))
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_are_inverse() {
        for status in [
            Status::Passed,
            Status::failed("RawPhyBER > 1e-7"),
            Status::warning("FecBin7 > 0"),
            Status::failed(""),
        ] {
            let parsed: Status = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_parse_legacy_verdicts() {
        assert_eq!("Pass".parse::<Status>().unwrap(), Status::Passed);
        assert_eq!(
            "Fail - Link is not active".parse::<Status>().unwrap(),
            Status::failed("Link is not active")
        );
        assert_eq!(
            "Watch - FecBin8 > 0".parse::<Status>().unwrap(),
            Status::warning("FecBin8 > 0")
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("Broken".parse::<Status>().is_err());
        assert!("Failedness".parse::<Status>().is_err());
    }

    #[test]
    fn test_worst_prefers_higher_severity() {
        let warn = Status::warning("a");
        let fail = Status::failed("b");
        assert_eq!(warn.clone().worst(fail.clone()), fail);
        assert_eq!(fail.clone().worst(warn), fail);
        assert_eq!(Status::Passed.worst(Status::Passed), Status::Passed);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Status::failed("EffPhyErrs > 0")).unwrap();
        insta::assert_snapshot!(json, @r#""Failed - EffPhyErrs > 0""#);
        let back: Status = serde_json::from_str(&json).unwrap();
        assert!(back.is_failed());
    }
}
