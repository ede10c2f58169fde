//! Import status tracking for UI display.

use montage_project_model::AssetId;
use serde::Serialize;

/// Where an import currently stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImportStatus {
    /// Probe still running; the asset is a processing placeholder.
    Pending,
    /// Duration resolved and the asset marked ready.
    Resolved { duration_secs: f64 },
    /// Probe failed; the asset stays processing.
    Failed { message: String },
}

impl ImportStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ImportStatus::Pending)
    }
}

/// One import known to the queue.
#[derive(Debug, Clone, Serialize)]
pub struct ImportEntry {
    pub asset_id: AssetId,
    pub name: String,
    pub status: ImportStatus,
}

/// Ordered record of every import started by an importer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportQueue {
    entries: Vec<ImportEntry>,
}

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, asset_id: AssetId, name: impl Into<String>) {
        self.entries.push(ImportEntry {
            asset_id,
            name: name.into(),
            status: ImportStatus::Pending,
        });
    }

    pub(crate) fn set_status(&mut self, asset_id: AssetId, status: ImportStatus) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.asset_id == asset_id) {
            entry.status = status;
        }
    }

    /// Entries in the order the imports were started.
    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn status(&self, asset_id: AssetId) -> Option<&ImportStatus> {
        self.entries
            .iter()
            .find(|e| e.asset_id == asset_id)
            .map(|e| &e.status)
    }

    /// Number of imports still waiting for their probe.
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_pending()).count()
    }

    /// Number of imports whose probe failed.
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, ImportStatus::Failed { .. }))
            .count()
    }
}
