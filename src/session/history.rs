//! Undo/Redo History
//!
//! Each entry stores the complete graph snapshot before and after a
//! mutation. Snapshots share unchanged layers, so keeping both is cheap.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_UNDO_LEVELS;
use crate::error::{LayercraftError, Result};
use crate::graph::LayerGraph;

/// A single undoable mutation
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Unique identifier for this entry
    pub id: String,
    /// Human-readable description of the mutation
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub before: LayerGraph,
    pub after: LayerGraph,
}

impl HistoryEntry {
    pub fn new(description: impl Into<String>, before: LayerGraph, after: LayerGraph) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            timestamp: Utc::now(),
            before,
            after,
        }
    }
}

/// Bounded undo and redo stacks
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_levels: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_LEVELS)
    }
}

impl History {
    pub fn new(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a new entry. Clears the redo stack and drops the oldest entry
    /// once the level limit is exceeded.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        self.undo_stack.push(entry);

        if self.undo_stack.len() > self.max_levels {
            let overflow = self.undo_stack.len() - self.max_levels;
            self.undo_stack.drain(..overflow);
        }
    }

    /// Pop the latest entry onto the redo stack
    ///
    /// # Errors
    /// `NothingToUndo` if the undo stack is empty
    pub fn undo(&mut self) -> Result<&HistoryEntry> {
        let entry = self.undo_stack.pop().ok_or(LayercraftError::NothingToUndo)?;
        self.redo_stack.push(entry);
        self.redo_stack.last().ok_or(LayercraftError::NothingToUndo)
    }

    /// Pop the latest undone entry back onto the undo stack
    ///
    /// # Errors
    /// `NothingToRedo` if the redo stack is empty
    pub fn redo(&mut self) -> Result<&HistoryEntry> {
        let entry = self.redo_stack.pop().ok_or(LayercraftError::NothingToRedo)?;
        self.undo_stack.push(entry);
        self.undo_stack.last().ok_or(LayercraftError::NothingToRedo)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undoable entries, oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
