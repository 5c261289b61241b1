//! Core types for fathom.
//!
//! This crate provides the shadow scan tree and the contracts around it:
//! nodes and aggregate metrics, the generational [`ScanTree`] arena, scan
//! configuration, the error/warning taxonomy, the [`ScanListener`] event
//! contract, the persisted [`MetricCache`], and the [`PeerMap`] linking
//! presentation objects to scan nodes.
//!
//! The traversal itself lives in `fathom-scan`; renderers and file
//! managers are consumers of these types, never owners of the tree.

mod cache;
mod config;
mod error;
mod events;
mod node;
mod peer;
mod tree;

pub use cache::{CacheError, MetricCache};
pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use events::{NullListener, ScanControl, ScanListener};
pub use node::{ChunkTag, Metrics, NodeId, NodeKind, ScanNode};
pub use peer::{PeerId, PeerMap};
pub use tree::ScanTree;
