//! Scan session control.
//!
//! The manager owns the shadow tree, at most one active session, and the
//! listener. It runs no thread of its own: traversal advances only when
//! the driver calls [`scan`](ScanManager::scan) (or the estimator-driven
//! [`step`](ScanManager::step)), and each call is bounded by the
//! configured quantum. Reentrancy is ruled out by `&mut self`; a driver
//! with parallelism must serialize its calls.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use fathom_core::{
    ChunkTag, NodeId, NullListener, ScanConfig, ScanControl, ScanError, ScanListener, ScanTree,
    ScanWarning,
};

use crate::estimator::{ChunkTags, ProgressEstimator};
use crate::scanner::Scanner;

struct ScanSession {
    fringe: VecDeque<NodeId>,
    running: bool,
    estimator: ProgressEstimator,
    scanner: Scanner,
}

/// Owns one scan session over a shadow tree.
pub struct ScanManager {
    tree: ScanTree,
    config: ScanConfig,
    listener: Box<dyn ScanListener>,
    session: Option<ScanSession>,
    next_tag: u32,
    warnings: Vec<ScanWarning>,
}

impl ScanManager {
    /// Manager with the given config and no listener.
    pub fn new(config: ScanConfig) -> Self {
        Self::with_listener(config, Box::new(NullListener))
    }

    /// Manager dispatching events to `listener`.
    pub fn with_listener(config: ScanConfig, listener: Box<dyn ScanListener>) -> Self {
        Self {
            tree: ScanTree::new(),
            config,
            listener,
            session: None,
            next_tag: 1,
            warnings: Vec::new(),
        }
    }

    /// Replace the listener.
    pub fn set_listener(&mut self, listener: Box<dyn ScanListener>) {
        self.listener = listener;
    }

    /// The shadow tree. Snapshot reads go through here; they must not
    /// overlap a scan call, which `&self`/`&mut self` already enforces on
    /// a single thread of control.
    pub fn tree(&self) -> &ScanTree {
        &self.tree
    }

    /// Root node of the current tree, if one has been set.
    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    /// Active configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Whether a session is currently running.
    pub fn scan_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.running)
    }

    /// Current fringe size.
    pub fn scan_length(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.fringe.len())
    }

    /// Latched percent estimate of the current session.
    pub fn percent(&self) -> Option<u8> {
        self.session.as_ref().and_then(|s| s.estimator.percent())
    }

    /// Directories finished so far in the current session.
    pub fn dirs_finished(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.estimator.dirs_finished())
    }

    /// Path of the most recently finished directory.
    pub fn last_finished_path(&self) -> Option<&Path> {
        self.session.as_ref().and_then(|s| s.estimator.last_finished())
    }

    /// Warnings accumulated since the session started.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Create or replace the tree root for `path`. Stops any running
    /// session and discards the old tree. Does not start scanning.
    ///
    /// A file path resolves to its parent directory.
    pub fn set_root(&mut self, path: impl AsRef<Path>) -> Result<NodeId, ScanError> {
        self.stop_scan();
        self.session = None;

        let path = path.as_ref();
        let mut resolved: PathBuf = path
            .canonicalize()
            .map_err(|err| ScanError::io(path, err))?;
        let metadata =
            std::fs::metadata(&resolved).map_err(|err| ScanError::io(&resolved, err))?;
        if !metadata.is_dir() {
            match resolved.parent() {
                Some(parent) => resolved = parent.to_path_buf(),
                None => {
                    return Err(ScanError::NotADirectory { path: resolved });
                }
            }
        }

        let name = resolved.to_string_lossy().to_string();
        let root = self.tree.set_root(resolved, name.into());
        Ok(root)
    }

    /// Start a session on `node`'s subtree.
    ///
    /// Any in-flight session is cancelled first. The subtree is always
    /// cleared before scanning so stale children can never be counted
    /// twice; the removed metrics are retracted from the ancestor chain.
    pub fn start_scan(&mut self, node: NodeId) -> Result<(), ScanError> {
        let Some(target) = self.tree.get(node) else {
            return Err(ScanError::StaleNode);
        };
        if !target.is_dir() {
            return Err(ScanError::NotADirectory {
                path: target.path().to_path_buf(),
            });
        }
        let path = target.path().to_path_buf();
        let parent = target.parent();

        self.stop_scan();
        self.warnings.clear();

        let removed = self.tree.clear_subtree(node);
        if !removed.is_zero() {
            self.listener.size_changed(&self.tree[node]);
            if let Some(parent) = parent {
                let listener = &mut *self.listener;
                self.tree
                    .retract_delta(parent, removed, |n| listener.size_changed(n));
            }
        }

        let metadata = std::fs::metadata(&path).map_err(|err| ScanError::io(&path, err))?;
        let tags = ChunkTags::starting_at(self.next_tag);
        self.next_tag += 3;
        self.tree.set_chunk(node, Some(tags.first));

        tracing::debug!(path = %path.display(), tag = tags.first.0, "scan session started");
        self.listener.scan_started(&self.tree[node]);

        self.session = Some(ScanSession {
            fringe: VecDeque::from([node]),
            running: true,
            estimator: ProgressEstimator::new(tags),
            scanner: Scanner::for_session(self.config.clone(), &metadata),
        });
        Ok(())
    }

    /// Cancel the running session, dropping its fringe. Already-expanded
    /// nodes keep whatever state they reached. No-op when idle.
    pub fn stop_scan(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.running {
                session.running = false;
                session.fringe.clear();
                tracing::debug!(
                    dirs = session.estimator.dirs_finished(),
                    "scan session stopped"
                );
            }
        }
    }

    /// Perform one quantum: up to `quantum_units` fringe expansions, each
    /// stamping its discoveries with `tag`. Returns the number of
    /// directory expansions completed; 0 when idle or drained.
    pub fn scan(&mut self, tag: Option<ChunkTag>) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        if !session.running {
            return 0;
        }

        let mut completed = 0;
        for _ in 0..self.config.quantum_units {
            if !session.running {
                break;
            }
            let listener = &mut *self.listener;
            match session
                .scanner
                .expand(&mut self.tree, &mut session.fringe, tag, listener)
            {
                Some(finished) => {
                    completed += 1;
                    let node = &self.tree[finished];
                    session.estimator.record_finished(node.chunk(), node.path());
                    tracing::trace!(path = %node.path().display(), "directory finished");
                    if self.listener.scan_finished(node) == ScanControl::Stop {
                        session.running = false;
                        session.fringe.clear();
                        break;
                    }
                    if session.fringe.is_empty() {
                        session.running = false;
                        session.estimator.finish();
                        let dirs = session.estimator.dirs_finished();
                        tracing::debug!(dirs, "scan session completed");
                        self.listener.session_completed(dirs);
                        break;
                    }
                }
                None => {
                    session.running = false;
                    session.estimator.finish();
                    let dirs = session.estimator.dirs_finished();
                    tracing::debug!(dirs, "scan session completed");
                    self.listener.session_completed(dirs);
                    break;
                }
            }
        }
        self.warnings.extend(session.scanner.take_warnings());
        completed
    }

    /// Perform one quantum using the estimator's current wave tag. This is
    /// what a driver loop calls repeatedly while the session runs.
    pub fn step(&mut self) -> usize {
        let Some(tag) = self
            .session
            .as_ref()
            .filter(|s| s.running)
            .map(|s| s.estimator.active_tag())
        else {
            return 0;
        };
        self.scan(tag)
    }
}

impl std::fmt::Debug for ScanManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanManager")
            .field("running", &self.scan_running())
            .field("fringe", &self.scan_length())
            .field("nodes", &self.tree.len())
            .finish()
    }
}
