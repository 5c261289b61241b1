//! Listener contract between the scan engine and its consumer.

use crate::node::ScanNode;

/// Verdict returned from a completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanControl {
    /// Keep scanning.
    #[default]
    Continue,
    /// Cancel the session before the next quantum. This is how a consumer
    /// stops a refresh from inside its own event handling.
    Stop,
}

/// Events emitted by the scan engine.
///
/// All methods have empty defaults; implement what you need. Callbacks run
/// synchronously inside the scan quantum and should be cheap. Consumers
/// that redraw do so on their own cadence from a snapshot read, not from
/// here.
pub trait ScanListener {
    /// A session started on `node`.
    fn scan_started(&mut self, node: &ScanNode) {
        let _ = node;
    }

    /// `node`'s aggregate metrics changed. Fired for the updated directory
    /// and again for each ancestor as the change propagates upward.
    fn size_changed(&mut self, node: &ScanNode) {
        let _ = node;
    }

    /// `node`'s own enumeration completed: its direct children are fully
    /// known and any subdirectories have been handed to the fringe. The
    /// subtree below it may still be unexpanded.
    fn scan_finished(&mut self, node: &ScanNode) -> ScanControl {
        let _ = node;
        ScanControl::Continue
    }

    /// The session drained its fringe.
    fn session_completed(&mut self, dirs_finished: u64) {
        let _ = dirs_finished;
    }
}

/// Listener that ignores every event.
#[derive(Debug, Default)]
pub struct NullListener;

impl ScanListener for NullListener {}
