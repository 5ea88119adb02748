//! Undo/redo history.
//!
//! Edits are value transformations, so history is a pair of snapshot stacks
//! rather than a log of inverse commands.

use std::collections::VecDeque;

use crate::timeline::Timeline;

/// Undo/redo history of timeline snapshots.
#[derive(Debug)]
pub struct History {
    /// Timelines before each applied edit (most recent last).
    undo: VecDeque<Timeline>,
    /// Timelines that have been undone (most recent last).
    redo: Vec<Timeline>,
    /// Maximum history depth.
    max_depth: usize,
}

impl History {
    /// Create a history with the given maximum depth.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the timeline as it was before an edit.
    /// Clears the redo stack (new action invalidates redo history).
    pub fn push(&mut self, previous: Timeline) {
        self.redo.clear();
        self.push_undo(previous);
    }

    fn push_undo(&mut self, timeline: Timeline) {
        self.undo.push_back(timeline);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    /// Step back. `current` moves onto the redo stack and the previous
    /// snapshot is returned.
    pub fn undo(&mut self, current: &Timeline) -> Option<Timeline> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: &Timeline) -> Option<Timeline> {
        let next = self.redo.pop()?;
        self.push_undo(current.clone());
        Some(next)
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps available.
    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(200)
    }
}
