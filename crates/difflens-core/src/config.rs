//! Scan configuration types.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::filter::PathFilter;
use crate::mode::ComparisonMode;

/// Default number of leading bytes hashed before deciding whether a file
/// needs a full read.
pub const DEFAULT_PARTIAL_HASH_BYTES: u64 = 1_000_000;

/// Configuration for a fingerprinting scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root directory to scan.
    pub root: PathBuf,

    /// Fingerprint granularity.
    #[builder(default)]
    #[serde(default)]
    pub mode: ComparisonMode,

    /// Bytes hashed for the partial fingerprint.
    #[builder(default = "DEFAULT_PARTIAL_HASH_BYTES")]
    #[serde(default = "default_partial_hash_bytes")]
    pub partial_hash_bytes: u64,

    /// Seconds between progress reports.
    #[builder(default = "30")]
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,

    /// Files between progress reports.
    #[builder(default = "10_000")]
    #[serde(default = "default_progress_interval_files")]
    pub progress_interval_files: u64,

    /// File-name extensions to skip, e.g. `*.nfo`.
    #[builder(default)]
    #[serde(default)]
    pub exclude_extensions: Vec<String>,

    /// Relative directory prefixes to skip, e.g. `./foo/bar`.
    #[builder(default)]
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// Worker threads (1 = single-threaded, 0 = auto-detect).
    #[builder(default = "1")]
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_partial_hash_bytes() -> u64 {
    DEFAULT_PARTIAL_HASH_BYTES
}

fn default_progress_interval_secs() -> u64 {
    30
}

fn default_progress_interval_files() -> u64 {
    10_000
}

fn default_threads() -> usize {
    1
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.partial_hash_bytes == Some(0) {
            return Err("Partial hash byte count must be positive".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mode: ComparisonMode::default(),
            partial_hash_bytes: DEFAULT_PARTIAL_HASH_BYTES,
            progress_interval_secs: default_progress_interval_secs(),
            progress_interval_files: default_progress_interval_files(),
            exclude_extensions: Vec::new(),
            exclude_paths: Vec::new(),
            threads: default_threads(),
        }
    }

    /// Build the exclusion filter described by this config.
    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(&self.exclude_extensions, &self.exclude_paths)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user")
            .mode(ComparisonMode::Partial)
            .partial_hash_bytes(4096u64)
            .threads(4usize)
            .exclude_extensions(vec!["*.nfo".to_string()])
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.mode, ComparisonMode::Partial);
        assert_eq!(config.partial_hash_bytes, 4096);
        assert_eq!(config.threads, 4);
        assert_eq!(config.progress_interval_files, 10_000);
        assert!(config.path_filter().has_excluded_extension("x.nfo"));
    }

    #[test]
    fn test_config_simple() {
        let config = ScanConfig::new("/home/user");
        assert_eq!(config.mode, ComparisonMode::Full);
        assert_eq!(config.partial_hash_bytes, 1_000_000);
        assert_eq!(config.progress_interval(), Duration::from_secs(30));
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn test_builder_validation() {
        assert!(ScanConfig::builder().build().is_err());
        assert!(ScanConfig::builder().root("").build().is_err());
        assert!(ScanConfig::builder().root("/x").partial_hash_bytes(0u64).build().is_err());
    }
}
