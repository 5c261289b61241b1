//! Scan tree node types.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::peer::PeerId;

/// Handle to a node within a [`ScanTree`](crate::ScanTree).
///
/// Handles are generational: discarding a subtree bumps the generation of
/// the freed slots, so a handle kept across a clear or rebuild resolves to
/// `None` instead of aliasing whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Label identifying which traversal wave created a node.
///
/// Opaque to the tree; only the progress estimator gives it meaning. A node
/// keeps the tag it was created with until the subtree is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub u32);

impl ChunkTag {
    /// Create a new tag from a raw value.
    pub fn new(tag: u32) -> Self {
        Self(tag)
    }
}

/// Aggregate size and count metrics for one subtree.
///
/// For a directory these cover everything observed below it so far; a
/// directory contributes no size of its own, so a fully scanned directory's
/// metrics are exactly the sum over its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Total size in bytes.
    pub size: u64,
    /// Direct plus recursive file count.
    pub file_count: u64,
    /// Direct plus recursive directory count.
    pub dir_count: u64,
}

impl Metrics {
    /// All-zero metrics.
    pub const ZERO: Metrics = Metrics {
        size: 0,
        file_count: 0,
        dir_count: 0,
    };

    /// Metrics for a single file of the given size.
    pub fn file(size: u64) -> Self {
        Metrics {
            size,
            file_count: 1,
            dir_count: 0,
        }
    }

    /// Check whether every counter is zero.
    pub fn is_zero(&self) -> bool {
        *self == Metrics::ZERO
    }

    /// Add another set of metrics, saturating on overflow.
    pub fn add(&mut self, other: Metrics) {
        self.size = self.size.saturating_add(other.size);
        self.file_count = self.file_count.saturating_add(other.file_count);
        self.dir_count = self.dir_count.saturating_add(other.dir_count);
    }

    /// Subtract another set of metrics, saturating at zero.
    pub fn subtract(&mut self, other: Metrics) {
        self.size = self.size.saturating_sub(other.size);
        self.file_count = self.file_count.saturating_sub(other.file_count);
        self.dir_count = self.dir_count.saturating_sub(other.dir_count);
    }
}

/// Kind of filesystem entry a node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Directory; the only kind that can carry children.
    Directory,
    /// Regular file.
    File,
    /// Symbolic link, kept as a leaf.
    Symlink {
        /// Link target path.
        target: CompactString,
        /// Whether the target is missing.
        broken: bool,
    },
    /// Anything else (sockets, devices, unreadable entries). Zero-cost leaf.
    Other,
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, NodeKind::Symlink { .. })
    }
}

/// One filesystem entry in the shadow scan tree.
///
/// Nodes are created and mutated only through [`ScanTree`](crate::ScanTree);
/// consumers get shared references out of the tree.
#[derive(Debug)]
pub struct ScanNode {
    pub(crate) path: PathBuf,
    pub(crate) name: CompactString,
    pub(crate) kind: NodeKind,
    pub(crate) metrics: Metrics,
    pub(crate) chunk: Option<ChunkTag>,
    pub(crate) scanned: bool,
    pub(crate) depth: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) peer: Option<PeerId>,
}

impl ScanNode {
    /// Absolute path of the entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name (last path component, or the full path for a root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Aggregate metrics observed for this subtree so far.
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.metrics.size
    }

    /// Direct plus recursive file count.
    pub fn file_count(&self) -> u64 {
        self.metrics.file_count
    }

    /// Direct plus recursive directory count.
    pub fn dir_count(&self) -> u64 {
        self.metrics.dir_count
    }

    /// Traversal wave that created this node, if any.
    pub fn chunk(&self) -> Option<ChunkTag> {
        self.chunk
    }

    /// Whether this directory's own enumeration has completed. Does not
    /// imply the subtree below it is fully expanded.
    pub fn is_scanned(&self) -> bool {
        self.scanned
    }

    /// Depth below the tree root (root is 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in discovery order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Presentation-side peer, if one has been linked.
    pub fn peer(&self) -> Option<PeerId> {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_add() {
        let mut m = Metrics::file(100);
        m.add(Metrics::file(50));
        assert_eq!(m.size, 150);
        assert_eq!(m.file_count, 2);
        assert_eq!(m.dir_count, 0);
    }

    #[test]
    fn test_metrics_subtract_saturates() {
        let mut m = Metrics::file(10);
        m.subtract(Metrics {
            size: 100,
            file_count: 5,
            dir_count: 3,
        });
        assert_eq!(m, Metrics::ZERO);
        assert!(m.is_zero());
    }

    #[test]
    fn test_node_kind_discrimination() {
        assert!(NodeKind::Directory.is_dir());
        assert!(NodeKind::File.is_file());
        assert!(
            NodeKind::Symlink {
                target: "x".into(),
                broken: false
            }
            .is_symlink()
        );
        assert!(!NodeKind::Other.is_dir());
        assert!(!NodeKind::Other.is_file());
    }

    #[test]
    fn test_chunk_tag_equality() {
        assert_eq!(ChunkTag::new(7), ChunkTag(7));
        assert_ne!(ChunkTag::new(7), ChunkTag(8));
    }
}
