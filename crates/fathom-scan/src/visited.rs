//! Physical directory identity tracking.
//!
//! One set lives per session and is consulted before descending into any
//! directory, so symlinks (or bind mounts) that lead back into territory
//! the session has already claimed are refused rather than re-entered.

use std::collections::HashSet;
use std::fs::Metadata;

/// Identity of a physical directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirIdentity {
    /// Device ID.
    pub device: u64,
    /// Inode number.
    pub inode: u64,
}

impl DirIdentity {
    /// Identity from metadata. `None` on platforms without stable inode
    /// identities; callers then skip cycle checking.
    #[cfg(unix)]
    pub fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Set of directories a session has already claimed.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<DirIdentity>,
}

impl VisitedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a directory. Returns `true` if this is the first visit.
    pub fn track(&mut self, identity: DirIdentity) -> bool {
        self.seen.insert(identity)
    }

    /// Check whether a directory has been claimed, without claiming it.
    pub fn has_seen(&self, identity: &DirIdentity) -> bool {
        self.seen.contains(identity)
    }

    /// Number of claimed directories.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check whether no directory has been claimed.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_first_visit() {
        let mut visited = VisitedSet::new();
        let id = DirIdentity {
            device: 1,
            inode: 12345,
        };
        assert!(visited.track(id));
        assert!(!visited.track(id));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_same_inode_different_device() {
        let mut visited = VisitedSet::new();
        assert!(visited.track(DirIdentity {
            device: 1,
            inode: 7
        }));
        assert!(visited.track(DirIdentity {
            device: 2,
            inode: 7
        }));
    }

    #[test]
    fn test_has_seen() {
        let mut visited = VisitedSet::new();
        let id = DirIdentity {
            device: 3,
            inode: 9,
        };
        assert!(!visited.has_seen(&id));
        visited.track(id);
        assert!(visited.has_seen(&id));
    }
}
