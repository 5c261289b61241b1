//! Adaptive completion estimate for a traversal of unknown total size.
//!
//! The total directory count is unknown until the fringe drains, yet the
//! consumer wants a smoothly increasing 0–100 value throughout. The
//! traversal is therefore partitioned into successive waves, each stamped
//! with its own chunk tag, and the growth observed in completed early
//! waves is projected onto the remainder. The projection is revised twice
//! as better samples arrive, each revision constructed so the displayed
//! ratio does not jump at the hand-over.
//!
//! Directory trees branch roughly self-similarly, which is what makes the
//! first waves informative about the total without a pre-pass.

use std::path::{Path, PathBuf};

use fathom_core::ChunkTag;

/// Wave-1 completions needed before any projection is attempted.
const SAMPLE_THRESHOLD: i64 = 100;

/// Stage of the estimate. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Counting the first wave; nothing is reported yet.
    Sample = 1,
    /// First projection: the sampled wave is assumed to be a third of the
    /// total.
    Project = 2,
    /// Second projection from the wave-2 sample, capped near 66%.
    Refine = 3,
    /// Final projection; the remaining fringe drains untagged.
    Drain = 4,
}

/// The three wave tags of one session, in increasing order.
#[derive(Debug, Clone, Copy)]
pub struct ChunkTags {
    pub first: ChunkTag,
    pub second: ChunkTag,
    pub third: ChunkTag,
}

impl ChunkTags {
    /// Three consecutive tags starting at `base`.
    pub fn starting_at(base: u32) -> Self {
        Self {
            first: ChunkTag(base),
            second: ChunkTag(base + 1),
            third: ChunkTag(base + 2),
        }
    }
}

/// Four-phase percent-complete state machine.
///
/// Fed one event per finished directory; read back as a latched percent.
/// `progress` and `progress_size` are directory-equivalents, not real
/// counts; [`dirs_finished`](Self::dirs_finished) carries the true total
/// for display.
#[derive(Debug)]
pub struct ProgressEstimator {
    phase: Phase,
    tags: ChunkTags,
    chunk_size1: i64,
    chunk_size2: i64,
    chunk_size3: i64,
    progress: i64,
    progress_size: i64,
    dirs_finished: u64,
    last_finished: Option<PathBuf>,
    reported: Option<u8>,
    complete: bool,
}

impl ProgressEstimator {
    /// Fresh estimator for a session using the given wave tags.
    pub fn new(tags: ChunkTags) -> Self {
        Self {
            phase: Phase::Sample,
            tags,
            chunk_size1: 0,
            chunk_size2: 0,
            chunk_size3: 0,
            progress: 0,
            progress_size: 0,
            dirs_finished: 0,
            last_finished: None,
            reported: None,
            complete: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Tag to stamp newly discovered directories with; `None` once the
    /// estimate is final and the fringe drains untagged.
    pub fn active_tag(&self) -> Option<ChunkTag> {
        match self.phase {
            Phase::Sample => Some(self.tags.first),
            Phase::Project => Some(self.tags.second),
            Phase::Refine => Some(self.tags.third),
            Phase::Drain => None,
        }
    }

    /// True count of directories finished this session.
    pub fn dirs_finished(&self) -> u64 {
        self.dirs_finished
    }

    /// Path of the most recently finished directory.
    pub fn last_finished(&self) -> Option<&Path> {
        self.last_finished.as_deref()
    }

    /// Whether the session has drained.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Latched percent estimate.
    ///
    /// `None` until the estimate first becomes meaningful (and forever, on
    /// degenerate sessions whose first wave never fills the sample). A
    /// drained session always reports 100.
    pub fn percent(&self) -> Option<u8> {
        if self.complete {
            return Some(100);
        }
        self.reported
    }

    /// Mark the session drained; the estimate jumps to 100.
    pub fn finish(&mut self) {
        self.complete = true;
    }

    /// Account one finished directory carrying `tag`.
    ///
    /// Phase transitions are evaluated here, after every event.
    pub fn record_finished(&mut self, tag: Option<ChunkTag>, path: &Path) {
        self.dirs_finished += 1;
        self.last_finished = Some(path.to_path_buf());

        if let Some(tag) = tag {
            match self.phase {
                Phase::Sample => {
                    if tag == self.tags.first {
                        self.chunk_size1 += 1;
                    }
                    if self.chunk_size1 > SAMPLE_THRESHOLD {
                        // assume the unscanned remainder is about twice the
                        // first wave: the wave maps to a third of the total
                        self.progress_size = 3 * self.chunk_size1;
                        self.phase = Phase::Project;
                        tracing::debug!(chunk = self.chunk_size1, "estimator entered projection");
                    }
                }
                Phase::Project => {
                    if tag == self.tags.first {
                        self.progress += 1;
                    } else if tag == self.tags.second {
                        self.chunk_size2 += 1;
                    }
                    // hand over at 80% of this phase's budget
                    if self.progress * 3 > self.progress_size * 8 / 10 {
                        // keep the displayed ratio unchanged through the
                        // hand-over; the ×3/2 at the end caps this phase
                        // near 66%
                        let percent =
                            self.progress as f64 / self.progress_size as f64 * 3.0 / 2.0;
                        let todo = self.chunk_size2 + (self.progress_size / 3 - self.progress);
                        self.progress_size = (todo as f64 / (1.0 - percent)) as i64;
                        self.progress = self.progress_size - todo;
                        self.progress_size = self.progress_size * 3 / 2;
                        self.phase = Phase::Refine;
                        tracing::debug!(
                            chunk = self.chunk_size2,
                            todo,
                            progress = self.progress,
                            progress_size = self.progress_size,
                            "estimator entered refinement"
                        );
                    }
                }
                Phase::Refine => {
                    if tag == self.tags.first || tag == self.tags.second {
                        self.progress += 1;
                    } else if tag == self.tags.third {
                        self.chunk_size3 += 1;
                    }
                    if self.progress * 3 / 2 > self.progress_size * 8 / 10 {
                        // terminal projection; no cap follows
                        let percent = self.progress as f64 / self.progress_size as f64;
                        let todo = self.chunk_size3 + (self.progress_size * 2 / 3 - self.progress);
                        self.progress_size = (todo as f64 / (1.0 - percent) + 0.5) as i64;
                        self.progress = self.progress_size - todo;
                        self.phase = Phase::Drain;
                        tracing::debug!(
                            chunk = self.chunk_size3,
                            todo,
                            progress = self.progress,
                            progress_size = self.progress_size,
                            "estimator entered drain"
                        );
                    }
                }
                Phase::Drain => {
                    if tag == self.tags.first
                        || tag == self.tags.second
                        || tag == self.tags.third
                    {
                        self.progress += 1;
                    }
                }
            }
        }

        // latch the report so integer truncation in a hand-over can never
        // step the displayed value backward
        if self.progress > 0 && self.progress_size > 0 {
            let raw = (self.progress * 100 / self.progress_size).clamp(0, 100) as u8;
            self.reported = Some(self.reported.map_or(raw, |r| r.max(raw)));
        }
    }
}
