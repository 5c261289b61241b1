//! Bounded fringe expansion.
//!
//! One unit of work enumerates exactly one directory's immediate entries:
//! leaf entries become terminal nodes, subdirectories are pushed onto the
//! fringe for a later unit. A unit's cost is bounded by that single
//! listing, never by subtree size, so the caller can interleave scanning
//! with anything else at quantum granularity.

use std::collections::VecDeque;
use std::fs::Metadata;
use std::path::PathBuf;

use compact_str::CompactString;

use fathom_core::{
    ChunkTag, Metrics, NodeId, NodeKind, ScanConfig, ScanListener, ScanTree, ScanWarning,
};

use crate::visited::{DirIdentity, VisitedSet};

/// Expands fringe directories one unit at a time.
///
/// Owned by a session; the visited set and warning log live exactly as
/// long as the traversal they belong to.
#[derive(Debug)]
pub struct Scanner {
    config: ScanConfig,
    visited: VisitedSet,
    warnings: Vec<ScanWarning>,
    root_device: Option<u64>,
}

impl Scanner {
    /// Scanner for a session rooted at a directory with the given
    /// metadata. The root's identity is claimed up front so a symlink
    /// back to it is refused like any other revisit.
    pub fn for_session(config: ScanConfig, root_metadata: &Metadata) -> Self {
        let mut visited = VisitedSet::new();
        if let Some(identity) = DirIdentity::of(root_metadata) {
            visited.track(identity);
        }
        Self {
            config,
            visited,
            warnings: Vec::new(),
            root_device: device_of(root_metadata),
        }
    }

    /// Drain the warnings recorded since the last call.
    pub fn take_warnings(&mut self) -> Vec<ScanWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Perform one unit of work: pop the fringe head and enumerate it.
    ///
    /// Newly discovered subdirectories are stamped with `tag` and pushed
    /// onto the fringe. Aggregates propagate to the node's ancestors
    /// before this returns, firing `size_changed` bottom-up. Returns the
    /// finished node, or `None` once the fringe holds nothing live.
    pub fn expand(
        &mut self,
        tree: &mut ScanTree,
        fringe: &mut VecDeque<NodeId>,
        tag: Option<ChunkTag>,
        listener: &mut dyn ScanListener,
    ) -> Option<NodeId> {
        let id = loop {
            let candidate = fringe.pop_front()?;
            if tree.contains(candidate) {
                break candidate;
            }
            // ids whose subtree was cleared mid-session are skipped
        };

        let path = tree[id].path().to_path_buf();
        let mut delta = Metrics::ZERO;

        match std::fs::read_dir(&path) {
            Ok(entries) => {
                for entry in entries {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(err) => {
                            self.warnings.push(ScanWarning::read_error(&path, &err));
                            continue;
                        }
                    };
                    self.record_entry(tree, fringe, id, &entry, tag, &mut delta);
                }
            }
            Err(err) => {
                // the directory itself is unreadable; it finishes empty
                self.warnings.push(ScanWarning::read_error(&path, &err));
            }
        }

        tree.mark_scanned(id);
        tree.apply_delta(id, delta, |node| listener.size_changed(node));
        Some(id)
    }

    fn record_entry(
        &mut self,
        tree: &mut ScanTree,
        fringe: &mut VecDeque<NodeId>,
        parent: NodeId,
        entry: &std::fs::DirEntry,
        tag: Option<ChunkTag>,
        delta: &mut Metrics,
    ) {
        let name = entry.file_name().to_string_lossy().to_string();
        if self.config.should_skip_hidden(&name) || self.config.should_ignore(&name) {
            return;
        }
        let path = entry.path();

        // does not traverse symlinks
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                self.warnings.push(ScanWarning::metadata_error(&path, &err));
                tree.add_leaf_child(parent, name.into(), path, NodeKind::Other, Metrics::ZERO);
                return;
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            self.record_dir(tree, fringe, parent, name, path, &metadata, tag, delta);
        } else if file_type.is_file() {
            let size = self.entry_size(&metadata);
            tree.add_leaf_child(
                parent,
                name.into(),
                path,
                NodeKind::File,
                Metrics::file(size),
            );
            delta.add(Metrics::file(size));
        } else if file_type.is_symlink() {
            self.record_symlink(tree, fringe, parent, name, path, tag, delta);
        } else {
            // sockets, fifos, device nodes
            tree.add_leaf_child(parent, name.into(), path, NodeKind::Other, Metrics::ZERO);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_dir(
        &mut self,
        tree: &mut ScanTree,
        fringe: &mut VecDeque<NodeId>,
        parent: NodeId,
        name: String,
        path: PathBuf,
        metadata: &Metadata,
        tag: Option<ChunkTag>,
        delta: &mut Metrics,
    ) {
        if !self.config.cross_filesystems
            && self.root_device.is_some()
            && device_of(metadata) != self.root_device
        {
            return;
        }
        if let Some(identity) = DirIdentity::of(metadata) {
            if !self.visited.track(identity) {
                self.warnings.push(ScanWarning::cycle(&path));
                tree.add_leaf_child(parent, name.into(), path, NodeKind::Other, Metrics::ZERO);
                return;
            }
        }

        let within_depth = self
            .config
            .max_depth
            .is_none_or(|limit| tree[parent].depth() < limit);
        if let Some(child) = tree.add_dir_child(parent, name.into(), path, tag) {
            delta.dir_count += 1;
            if within_depth {
                fringe.push_back(child);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_symlink(
        &mut self,
        tree: &mut ScanTree,
        fringe: &mut VecDeque<NodeId>,
        parent: NodeId,
        name: String,
        path: PathBuf,
        tag: Option<ChunkTag>,
        delta: &mut Metrics,
    ) {
        if self.config.follow_symlinks {
            // resolve the target; only directory targets are descended
            if let Ok(target_metadata) = std::fs::metadata(&path) {
                if target_metadata.is_dir() {
                    self.record_dir(
                        tree,
                        fringe,
                        parent,
                        name,
                        path,
                        &target_metadata,
                        tag,
                        delta,
                    );
                    return;
                }
            }
        }

        let target = std::fs::read_link(&path)
            .map(|target| target.to_string_lossy().to_string())
            .unwrap_or_default();
        let broken = !path.exists();
        if broken {
            self.warnings.push(ScanWarning::broken_symlink(&path, &target));
        }
        tree.add_leaf_child(
            parent,
            name.into(),
            path,
            NodeKind::Symlink {
                target: CompactString::from(target),
                broken,
            },
            Metrics::ZERO,
        );
    }

    fn entry_size(&self, metadata: &Metadata) -> u64 {
        if self.config.apparent_size {
            metadata.len()
        } else {
            blocks_of(metadata) * 512
        }
    }
}

/// Device ID from metadata, where the platform has one.
#[cfg(unix)]
fn device_of(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
fn device_of(_metadata: &Metadata) -> Option<u64> {
    None
}

/// Number of 512-byte blocks allocated to the entry.
#[cfg(unix)]
fn blocks_of(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.blocks()
}

#[cfg(not(unix))]
fn blocks_of(metadata: &Metadata) -> u64 {
    metadata.len().div_ceil(512)
}
