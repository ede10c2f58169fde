//! Snapshot-based undo/redo.
//!
//! Each entry holds the whole project as it was *before* an edit. Drag
//! gestures that mutate the model on every pointer move are wrapped in a
//! batch so the drag collapses into a single undo step.

use std::collections::VecDeque;

use montage_project_model::Project;

#[derive(Debug, Clone)]
struct HistoryEntry {
    label: String,
    snapshot: Project,
}

#[derive(Debug)]
struct PendingBatch {
    label: String,
    before: Project,
    dirty: bool,
}

/// Bounded undo/redo stacks of project snapshots.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
    batch: Option<PendingBatch>,
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_entries,
            batch: None,
        }
    }

    /// Record the state before an edit. Ignored while a batch is open,
    /// except that it marks the batch as having changed something.
    pub fn record(&mut self, label: &str, before: &Project) {
        if let Some(batch) = &mut self.batch {
            batch.dirty = true;
            return;
        }
        self.push(label.to_string(), before.clone());
    }

    /// Start collapsing edits into one step.
    pub fn begin_batch(&mut self, label: &str, before: &Project) {
        if self.batch.is_some() {
            tracing::warn!(label, "Batch already open, keeping the first one");
            return;
        }
        self.batch = Some(PendingBatch {
            label: label.to_string(),
            before: before.clone(),
            dirty: false,
        });
    }

    /// Close the open batch. Returns whether it produced an undo step.
    pub fn end_batch(&mut self) -> bool {
        match self.batch.take() {
            Some(batch) if batch.dirty => {
                self.push(batch.label, batch.before);
                true
            }
            _ => false,
        }
    }

    /// Close the open batch without recording it. Returns the snapshot it
    /// started from if anything changed since.
    pub fn abort_batch(&mut self) -> Option<Project> {
        self.batch.take().filter(|b| b.dirty).map(|b| b.before)
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Step back. `current` is kept for redo; the returned snapshot should
    /// replace it.
    pub fn undo(&mut self, current: &Project) -> Option<Project> {
        self.end_batch();
        let entry = self.undo_stack.pop_back()?;
        tracing::debug!(label = %entry.label, remaining = self.undo_stack.len(), "Undo");
        self.redo_stack.push(HistoryEntry {
            label: entry.label,
            snapshot: current.clone(),
        });
        Some(entry.snapshot)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: &Project) -> Option<Project> {
        self.end_batch();
        let entry = self.redo_stack.pop()?;
        tracing::debug!(label = %entry.label, "Redo");
        self.undo_stack.push_back(HistoryEntry {
            label: entry.label,
            snapshot: current.clone(),
        });
        self.trim();
        Some(entry.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the step `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
    }

    fn push(&mut self, label: String, snapshot: Project) {
        self.redo_stack.clear();
        self.undo_stack.push_back(HistoryEntry { label, snapshot });
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.pop_front();
        }
    }
}
