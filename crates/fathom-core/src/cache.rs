//! Persisted directory metrics, used to pre-seed display before a fresh
//! scan completes.
//!
//! The cache is an explicitly passed value with a load-at-start,
//! save-at-end lifecycle; nothing here is process-global.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{Metrics, NodeId};
use crate::tree::ScanTree;

/// Errors loading or saving a [`MetricCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O failure on the cache file.
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file did not parse.
    #[error("Malformed cache file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Absolute path → last observed metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricCache {
    entries: BTreeMap<PathBuf, Metrics>,
}

impl MetricCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached directories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Previously observed metrics for a path, if any.
    pub fn lookup(&self, path: &Path) -> Option<Metrics> {
        self.entries.get(path).copied()
    }

    /// Record metrics for a path, replacing any previous entry.
    pub fn record(&mut self, path: impl Into<PathBuf>, metrics: Metrics) {
        self.entries.insert(path.into(), metrics);
    }

    /// Forget a path.
    pub fn remove(&mut self, path: &Path) -> Option<Metrics> {
        self.entries.remove(path)
    }

    /// Record every fully enumerated directory under `root`.
    pub fn record_tree(&mut self, tree: &ScanTree, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = tree.get(id) else {
                continue;
            };
            if node.is_dir() && node.is_scanned() {
                self.record(node.path(), node.metrics());
            }
            stack.extend_from_slice(node.children());
        }
    }

    /// Load a cache from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let data = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| CacheError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save the cache to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let data = serde_json::to_string_pretty(self).map_err(|source| CacheError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, data).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
