// src/history.rs
//
// Bounded undo/redo over (image, dimensions) snapshots.
//
// Pushes are debounced: a burst of edits inside the window collapses into
// one candidate, evaluated with the arguments of the last call. A candidate
// only lands on the undo stack when it differs enough from the current top
// (other pixels, more than a few pixels of size change, or enough time since
// the top was recorded). The oldest entry is the baseline and undo never
// pops it.

use crate::debounce::Debouncer;
use crate::error::{ResizerError, Result};
use crate::ops::Dimensions;
use crate::raster::Raster;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tuning for the history manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Quiet period before a pushed snapshot is evaluated.
    pub debounce_ms: u64,
    /// Maximum undo entries, baseline included.
    pub capacity: usize,
    /// A size change must exceed this many pixels on some axis to count.
    pub size_threshold_px: u32,
    /// Snapshots further apart than this always count.
    pub time_threshold_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            capacity: 30,
            size_threshold_px: 5,
            time_threshold_ms: 1000,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ResizerError::invalid_config(
                "history capacity must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// One undo/redo entry.
#[derive(Clone, Debug)]
pub struct HistoryState {
    pub image: Raster,
    pub dimensions: Dimensions,
    /// The first loaded image, restored alongside the entry.
    pub origin: Raster,
    pub created_at: Instant,
}

impl HistoryState {
    fn is_significantly_different(&self, top: Option<&HistoryState>, config: &HistoryConfig) -> bool {
        let Some(top) = top else {
            return true;
        };
        let dw = self.dimensions.width().abs_diff(top.dimensions.width());
        let dh = self.dimensions.height().abs_diff(top.dimensions.height());
        let elapsed = self.created_at.saturating_duration_since(top.created_at);

        !self.image.same_content(&top.image)
            || dw > config.size_threshold_px
            || dh > config.size_threshold_px
            || elapsed > Duration::from_millis(config.time_threshold_ms)
    }

    /// The recorded dimensions must describe the stored image.
    fn check(&self) -> Result<()> {
        if (self.image.width(), self.image.height()) != self.dimensions.as_tuple() {
            return Err(ResizerError::history_apply(format!(
                "entry records {} but holds a {}x{} image",
                self.dimensions,
                self.image.width(),
                self.image.height()
            )));
        }
        Ok(())
    }
}

/// Receives the entry chosen by undo/redo.
pub trait HistoryTarget {
    fn apply_history(&mut self, entry: &HistoryState) -> Result<()>;
}

/// Where the manager sits in its state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryPhase {
    Empty,
    HasBaseline,
    Navigable,
}

/// Result of evaluating a debounced push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    /// Too similar to the current top.
    Ignored,
}

/// Result of undo/redo.
#[derive(Debug)]
pub enum Navigation {
    Applied(Dimensions),
    /// Nothing to move to; the stacks are unchanged.
    Unavailable,
    /// The entry moved stacks but could not be applied to the target.
    Failed(ResizerError),
}

struct Candidate {
    image: Raster,
    dimensions: Dimensions,
    origin: Raster,
}

pub struct History {
    config: HistoryConfig,
    undo_stack: VecDeque<HistoryState>,
    redo_stack: Vec<HistoryState>,
    pending: Debouncer<Candidate>,
    applying: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            pending: Debouncer::new(config.debounce()),
            undo_stack: VecDeque::with_capacity(config.capacity.min(64) + 1),
            redo_stack: Vec::new(),
            config,
            applying: false,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Schedule a snapshot. Ignored while an entry is being applied.
    pub fn push(&mut self, image: Raster, dimensions: Dimensions, origin: Raster, now: Instant) {
        if self.applying {
            debug!(target: "image_resizer::history", "push ignored while applying");
            return;
        }
        self.pending.call(
            Candidate {
                image,
                dimensions,
                origin,
            },
            now,
        );
    }

    /// Evaluate the pending snapshot if its window has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<PushOutcome> {
        let candidate = self.pending.poll(now)?;
        Some(self.commit(candidate, now))
    }

    /// Evaluate the pending snapshot immediately.
    pub fn flush_now(&mut self, now: Instant) -> Option<PushOutcome> {
        let candidate = self.pending.take()?;
        Some(self.commit(candidate, now))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// When the pending snapshot becomes due.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    fn commit(&mut self, candidate: Candidate, now: Instant) -> PushOutcome {
        let state = HistoryState {
            image: candidate.image,
            dimensions: candidate.dimensions,
            origin: candidate.origin,
            created_at: now,
        };
        if !state.is_significantly_different(self.undo_stack.back(), &self.config) {
            debug!(
                target: "image_resizer::history",
                dimensions = %state.dimensions,
                "snapshot too similar to top, skipped"
            );
            return PushOutcome::Ignored;
        }

        self.redo_stack.clear();
        self.undo_stack.push_back(state);
        if self.undo_stack.len() > self.config.capacity {
            self.undo_stack.pop_front();
        }
        debug!(
            target: "image_resizer::history",
            undo = self.undo_stack.len(),
            "snapshot recorded"
        );
        PushOutcome::Accepted
    }

    /// Step back one entry. The baseline is never popped.
    pub fn undo<T: HistoryTarget + ?Sized>(&mut self, target: &mut T) -> Navigation {
        if self.undo_stack.len() <= 1 {
            return Navigation::Unavailable;
        }
        let Some(current) = self.undo_stack.pop_back() else {
            return Navigation::Unavailable;
        };
        self.redo_stack.push(current);
        match self.undo_stack.back().cloned() {
            Some(previous) => self.apply_state(&previous, target),
            None => Navigation::Unavailable,
        }
    }

    /// Re-apply the most recently undone entry.
    pub fn redo<T: HistoryTarget + ?Sized>(&mut self, target: &mut T) -> Navigation {
        let Some(next) = self.redo_stack.pop() else {
            return Navigation::Unavailable;
        };
        self.undo_stack.push_back(next.clone());
        self.apply_state(&next, target)
    }

    /// Hand `entry` to the target with pushes suppressed.
    /// Failures (including panics) are reported, never propagated.
    pub fn apply_state<T: HistoryTarget + ?Sized>(
        &mut self,
        entry: &HistoryState,
        target: &mut T,
    ) -> Navigation {
        self.applying = true;
        let result = catch_unwind(AssertUnwindSafe(|| {
            entry.check()?;
            target.apply_history(entry)
        }));
        self.applying = false;

        let error = match result {
            Ok(Ok(())) => return Navigation::Applied(entry.dimensions),
            Ok(Err(err @ ResizerError::HistoryApply { .. })) => err,
            Ok(Err(err)) => ResizerError::history_apply(err.to_string()),
            Err(_) => ResizerError::history_apply("panic while restoring entry"),
        };
        warn!(target: "image_resizer::history", error = %error, "failed to apply entry");
        Navigation::Failed(error)
    }

    /// Drop every entry and any pending snapshot.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending.cancel();
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_applying(&self) -> bool {
        self.applying
    }

    /// Undo entries, baseline included.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn top(&self) -> Option<&HistoryState> {
        self.undo_stack.back()
    }

    pub fn phase(&self) -> HistoryPhase {
        match (self.undo_stack.len(), self.redo_stack.is_empty()) {
            (0, true) => HistoryPhase::Empty,
            (1, true) => HistoryPhase::HasBaseline,
            _ => HistoryPhase::Navigable,
        }
    }

    /// Dimensions of every undo entry, oldest first.
    pub fn undo_dimensions(&self) -> Vec<Dimensions> {
        self.undo_stack.iter().map(|s| s.dimensions).collect()
    }
}
