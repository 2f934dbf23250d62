//! Host lists for fleet runs.
//!
//! A hostfile holds one entry per line; blank lines and `#` comments are
//! skipped. An entry may use a bracket pattern such as `gpu-[1,4,10-12]`.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::Path;

pub fn read_hostfile(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    parse_hostfile(&content)
}

pub fn parse_hostfile(content: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut hosts = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for host in expand_pattern(line)? {
            if seen.insert(host.clone()) {
                hosts.push(host);
            }
        }
    }

    Ok(hosts)
}

/// Expand `prefix-[a,b,c-d]suffix` into individual host names.
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>> {
    let Some(open) = pattern.find('[') else {
        return Ok(vec![pattern.to_string()]);
    };
    let close = pattern[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or_else(|| Error::InvalidHostPattern(pattern.to_string()))?;

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut hosts = Vec::new();

    for item in pattern[open + 1..close].split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once('-') {
            Some((start, end)) => {
                let start: u64 = start
                    .parse()
                    .map_err(|_| Error::InvalidHostPattern(pattern.to_string()))?;
                let end: u64 = end
                    .parse()
                    .map_err(|_| Error::InvalidHostPattern(pattern.to_string()))?;
                if start > end {
                    return Err(Error::InvalidHostPattern(pattern.to_string()));
                }
                hosts.extend((start..=end).map(|n| format!("{}{}{}", prefix, n, suffix)));
            }
            None => hosts.push(format!("{}{}{}", prefix, item, suffix)),
        }
    }

    if hosts.is_empty() {
        return Err(Error::InvalidHostPattern(pattern.to_string()));
    }
    Ok(hosts)
}
