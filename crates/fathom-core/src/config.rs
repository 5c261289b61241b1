//! Scan configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for a scan session.
///
/// The root path is not part of the config; it is handed to the manager
/// separately so one config can serve successive scans.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Descend into directory symlinks (cycle-checked against visited
    /// physical directories).
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Cross filesystem boundaries.
    #[builder(default = "false")]
    #[serde(default)]
    pub cross_filesystems: bool,

    /// Count apparent size rather than allocated disk blocks.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub apparent_size: bool,

    /// Maximum depth to expand (None = unlimited). Directories at the
    /// limit are recorded but not enumerated.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Entry names to skip (exact, `prefix*` or `*suffix`).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Include hidden entries (starting with `.`).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Directory expansions performed per scan quantum. Bounds the cost of
    /// a single `scan` call regardless of fringe size.
    #[builder(default = "5")]
    #[serde(default = "default_quantum_units")]
    pub quantum_units: usize,
}

fn default_true() -> bool {
    true
}

fn default_quantum_units() -> usize {
    5
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(units) = self.quantum_units {
            if units == 0 {
                return Err("quantum_units must be at least 1".to_string());
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Check if an entry name matches an ignore pattern.
    pub fn should_ignore(&self, name: &str) -> bool {
        for pattern in &self.ignore_patterns {
            if name == pattern {
                return true;
            }
            if let Some(prefix) = pattern.strip_suffix('*') {
                if !prefix.is_empty() && name.starts_with(prefix) {
                    return true;
                }
            }
            if let Some(suffix) = pattern.strip_prefix('*') {
                if name.ends_with(suffix) {
                    return true;
                }
            }
        }
        false
    }

    /// Check if a hidden entry should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            cross_filesystems: false,
            apparent_size: true,
            max_depth: None,
            ignore_patterns: Vec::new(),
            include_hidden: true,
            quantum_units: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .follow_symlinks(true)
            .quantum_units(2usize)
            .build()
            .unwrap();
        assert!(config.follow_symlinks);
        assert_eq!(config.quantum_units, 2);
        assert!(config.apparent_size);
    }

    #[test]
    fn test_zero_quantum_rejected() {
        let result = ScanConfig::builder().quantum_units(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_should_ignore() {
        let config = ScanConfig::builder()
            .ignore_patterns(vec!["node_modules".to_string(), "*.log".to_string()])
            .build()
            .unwrap();
        assert!(config.should_ignore("node_modules"));
        assert!(config.should_ignore("test.log"));
        assert!(!config.should_ignore("src"));
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = ScanConfig::default();
        assert!(!config.should_skip_hidden(".git"));

        config.include_hidden = false;
        assert!(config.should_skip_hidden(".git"));
        assert!(!config.should_skip_hidden("src"));
    }
}
