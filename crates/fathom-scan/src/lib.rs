//! Incremental directory scanning for fathom.
//!
//! This crate walks a directory tree in small bounded steps and converts
//! partial, wave-by-wave traversal results into a monotone percent
//! estimate while the total amount of work is still unknown.
//!
//! # Overview
//!
//! - [`ScanManager`] owns one session: start/stop control, the shadow
//!   tree, and listener dispatch.
//! - [`Scanner`] expands the fringe of unexpanded directories one bounded
//!   unit at a time.
//! - [`ProgressEstimator`] projects total work from completed early waves
//!   and revises the projection as better samples arrive.
//!
//! There is no background thread. The driver calls
//! [`step`](ScanManager::step) repeatedly while the session runs and
//! reads a snapshot (percent, finished count, last path) on its own
//! cadence:
//!
//! ```rust,no_run
//! use fathom_core::ScanConfig;
//! use fathom_scan::ScanManager;
//!
//! let mut manager = ScanManager::new(ScanConfig::default());
//! let root = manager.set_root("/var/log").unwrap();
//! manager.start_scan(root).unwrap();
//!
//! while manager.scan_running() {
//!     manager.step();
//!     if let Some(percent) = manager.percent() {
//!         eprintln!("{percent}% ({} folders)", manager.dirs_finished());
//!     }
//! }
//! assert_eq!(manager.percent(), Some(100));
//! ```

mod estimator;
mod manager;
mod scanner;
mod visited;

pub use estimator::{ChunkTags, Phase, ProgressEstimator};
pub use manager::ScanManager;
pub use scanner::Scanner;
pub use visited::{DirIdentity, VisitedSet};

// Re-export core types for convenience
pub use fathom_core::{
    ChunkTag, Metrics, NodeId, NodeKind, ScanConfig, ScanControl, ScanError, ScanListener,
    ScanNode, ScanTree, ScanWarning, WarningKind,
};
