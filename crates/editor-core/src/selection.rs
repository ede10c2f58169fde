//! Clip selection and group propagation.
//!
//! Selecting a grouped clip selects its whole group, and toggling any
//! member off deselects the whole group again. The selection also keeps
//! the most recently focused clip, which ungrouping narrows down to.

use montage_project_model::{ClipId, EditCommand, Project, ProjectError, TrackId};
use serde::Serialize;

/// A selected clip and the track it was on when last synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectedClip {
    pub clip_id: ClipId,
    pub track_id: TrackId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    entries: Vec<SelectedClip>,
    focused: Option<ClipId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, clip_id: ClipId) -> bool {
        self.entries.iter().any(|e| e.clip_id == clip_id)
    }

    /// Selected clips in selection order.
    pub fn entries(&self) -> &[SelectedClip] {
        &self.entries
    }

    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.entries.iter().map(|e| e.clip_id).collect()
    }

    /// The clip most recently clicked.
    pub fn focused(&self) -> Option<ClipId> {
        self.focused
    }

    /// Select a clip together with every member of its group.
    ///
    /// A non-additive select replaces the selection. An additive select of a
    /// clip that is already selected toggles it (and its group) off instead.
    /// Returns `false` if the clip does not exist.
    pub fn select(&mut self, project: &Project, clip_id: ClipId, additive: bool) -> bool {
        if project.clip(clip_id).is_none() {
            return false;
        }
        if additive && self.contains(clip_id) {
            self.deselect(project, clip_id);
            return true;
        }
        if !additive {
            self.entries.clear();
        }
        for member in linked_clips(project, clip_id) {
            if self.contains(member) {
                continue;
            }
            if let Some(clip) = project.clip(member) {
                self.entries.push(SelectedClip {
                    clip_id: member,
                    track_id: clip.track_id,
                });
            }
        }
        self.focused = Some(clip_id);
        tracing::debug!(clip = %clip_id, additive, selected = self.entries.len(), "Selection changed");
        true
    }

    /// Drop a clip and the rest of its group from the selection.
    pub fn deselect(&mut self, project: &Project, clip_id: ClipId) {
        let linked = linked_clips(project, clip_id);
        self.entries
            .retain(|e| e.clip_id != clip_id && !linked.contains(&e.clip_id));
        self.refocus();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.focused = None;
    }

    /// Forget a single clip, e.g. after it was deleted.
    pub fn remove_clip(&mut self, clip_id: ClipId) {
        self.entries.retain(|e| e.clip_id != clip_id);
        self.refocus();
    }

    /// Command that links every selected clip under a fresh group id.
    pub fn group_command(&self, project: &mut Project) -> Result<EditCommand, ProjectError> {
        if self.entries.len() < 2 {
            return Err(ProjectError::InvalidGroup {
                count: self.entries.len(),
            });
        }
        Ok(EditCommand::SetGroup {
            clip_ids: self.clip_ids(),
            group_id: Some(project.allocate_group_id()),
        })
    }

    /// Command that clears the group of every selected clip.
    pub fn ungroup_command(&self) -> Option<EditCommand> {
        if self.entries.is_empty() {
            return None;
        }
        Some(EditCommand::SetGroup {
            clip_ids: self.clip_ids(),
            group_id: None,
        })
    }

    /// Keep only the focused clip selected.
    pub fn narrow_to_focused(&mut self) {
        match self.focused {
            Some(focused) => self.entries.retain(|e| e.clip_id == focused),
            None => self.entries.clear(),
        }
    }

    /// Refresh track ids and drop clips that no longer exist.
    pub fn sync(&mut self, project: &Project) {
        self.entries.retain_mut(|entry| match project.clip(entry.clip_id) {
            Some(clip) => {
                entry.track_id = clip.track_id;
                true
            }
            None => false,
        });
        self.refocus();
    }

    fn refocus(&mut self) {
        if let Some(focused) = self.focused {
            if !self.contains(focused) {
                self.focused = self.entries.last().map(|e| e.clip_id);
            }
        }
    }
}

/// A clip plus all clips sharing its group.
fn linked_clips(project: &Project, clip_id: ClipId) -> Vec<ClipId> {
    match project.clip(clip_id).and_then(|c| c.group_id) {
        Some(group) => project.group_members(group),
        None => vec![clip_id],
    }
}
