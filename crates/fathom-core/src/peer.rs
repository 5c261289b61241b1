//! Association between presentation-layer objects and scan nodes.
//!
//! The link table is the only connection between the two trees: an
//! id-based lookup, never an ownership edge. The scan tree can be cleared
//! or rebuilt at any time; links into discarded subtrees simply stop
//! resolving.

use std::collections::HashMap;

use crate::node::{NodeId, ScanNode};
use crate::tree::ScanTree;

/// Identifier of a presentation-layer object, assigned by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u64);

/// Replaceable presentation-id → scan-node lookup table.
#[derive(Debug, Default)]
pub struct PeerMap {
    links: HashMap<PeerId, NodeId>,
}

impl PeerMap {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of links, dead ones included.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check whether the table holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Associate a presentation object with a scan node, recording the
    /// back-reference on the node. Replaces any previous link for `peer`.
    ///
    /// Returns `false` (and links nothing) if the node id is stale.
    pub fn link(&mut self, tree: &mut ScanTree, peer: PeerId, node: NodeId) -> bool {
        if !tree.contains(node) {
            return false;
        }
        if let Some(old) = self.links.insert(peer, node) {
            if old != node {
                tree.set_peer(old, None);
            }
        }
        tree.set_peer(node, Some(peer));
        true
    }

    /// Drop a link, clearing the node-side back-reference if the node is
    /// still live.
    pub fn unlink(&mut self, tree: &mut ScanTree, peer: PeerId) -> Option<NodeId> {
        let node = self.links.remove(&peer)?;
        tree.set_peer(node, None);
        Some(node)
    }

    /// Raw node id a peer points at, live or not.
    pub fn node_id(&self, peer: PeerId) -> Option<NodeId> {
        self.links.get(&peer).copied()
    }

    /// Resolve a peer to its scan node. Returns `None` for unknown peers
    /// and for links into cleared or rebuilt subtrees.
    pub fn resolve<'t>(&self, tree: &'t ScanTree, peer: PeerId) -> Option<&'t ScanNode> {
        tree.get(self.node_id(peer)?)
    }

    /// Drop every link whose node has gone stale.
    pub fn prune(&mut self, tree: &ScanTree) {
        self.links.retain(|_, node| tree.contains(*node));
    }
}
