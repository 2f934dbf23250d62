//! Sample tool output shipped under `crates/nodehealth-providers/tests/samples/`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Sample file manager for test data.
pub struct SampleFiles {
    samples_dir: PathBuf,
}

impl Default for SampleFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleFiles {
    pub fn new() -> Self {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let samples_dir = manifest_dir
            .parent()
            .unwrap()
            .join("nodehealth-providers/tests/samples");

        Self { samples_dir }
    }

    pub fn path(&self, sample_name: &str) -> PathBuf {
        self.samples_dir.join(sample_name)
    }

    pub fn read(&self, sample_name: &str) -> Result<String> {
        let path = self.path(sample_name);
        fs::read_to_string(&path).with_context(|| format!("reading sample {}", path.display()))
    }

    /// Copy a sample file to a destination, creating parent directories.
    pub fn copy_to(&self, sample_name: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(self.path(sample_name), dest)
            .with_context(|| format!("copying sample {}", sample_name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_are_reachable() {
        let samples = SampleFiles::new();
        assert!(samples.read("mlxlink_healthy.json").unwrap().contains("Operational Info"));
    }
}
