//! Edit commands: the single entry point for changing a project.
//!
//! Gestures, menu actions and scripted edits are all expressed as
//! [`EditCommand`] values and applied with [`Project::apply`]. Commands are
//! plain data, so they can be logged, serialized, or replayed.

use serde::{Deserialize, Serialize};

use crate::asset::MediaKind;
use crate::ids::{AssetId, ClipId, GroupId, TrackId};
use crate::project::{Project, ProjectError};
use crate::track::{Clip, Track};

/// One clip's destination in a [`EditCommand::MoveClips`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipMove {
    pub clip_id: ClipId,

    /// New leading edge. Negative values are clamped to zero.
    pub start_secs: f64,

    /// Destination track, or `None` to stay on the current one.
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

impl ClipMove {
    pub fn new(clip_id: ClipId, start_secs: f64, track_id: Option<TrackId>) -> Self {
        Self {
            clip_id,
            start_secs,
            track_id,
        }
    }
}

/// A single mutation of the project model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditCommand {
    AddTrack {
        kind: MediaKind,
        #[serde(default)]
        name: Option<String>,
    },
    RemoveTrack {
        track_id: TrackId,
    },
    ReorderTrack {
        from: usize,
        to: usize,
    },
    SwapTracks {
        a: TrackId,
        b: TrackId,
    },
    RenameTrack {
        track_id: TrackId,
        name: String,
    },
    AddClip {
        track_id: TrackId,
        asset_id: AssetId,
        start_secs: f64,
        #[serde(default)]
        group_id: Option<GroupId>,
    },
    MoveClips {
        moves: Vec<ClipMove>,
    },
    ResizeClip {
        clip_id: ClipId,
        duration_secs: f64,
    },
    SetClipLevel {
        clip_id: ClipId,
        level: f64,
    },
    SetClipMuted {
        clip_id: ClipId,
        muted: bool,
    },
    DeleteClip {
        clip_id: ClipId,
    },
    SplitClip {
        clip_id: ClipId,
        at_secs: f64,
    },
    MergeClips {
        left: ClipId,
        right: ClipId,
    },
    SetGroup {
        clip_ids: Vec<ClipId>,
        #[serde(default)]
        group_id: Option<GroupId>,
    },
    SetZoom {
        pixels_per_second: f64,
    },
    SetTotalDuration {
        secs: f64,
    },
}

/// What a successfully applied command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied,
    TrackAdded(TrackId),
    TrackRemoved(Track),
    ClipAdded(ClipId),
    ClipRemoved(Clip),
    ClipSplit { original: ClipId, created: ClipId },
}

impl EditCommand {
    /// Short human-readable label, used for undo history entries.
    pub fn label(&self) -> &'static str {
        match self {
            EditCommand::AddTrack { .. } => "Add track",
            EditCommand::RemoveTrack { .. } => "Remove track",
            EditCommand::ReorderTrack { .. } => "Reorder track",
            EditCommand::SwapTracks { .. } => "Swap tracks",
            EditCommand::RenameTrack { .. } => "Rename track",
            EditCommand::AddClip { .. } => "Add clip",
            EditCommand::MoveClips { .. } => "Move clips",
            EditCommand::ResizeClip { .. } => "Resize clip",
            EditCommand::SetClipLevel { .. } => "Set level",
            EditCommand::SetClipMuted { .. } => "Toggle mute",
            EditCommand::DeleteClip { .. } => "Delete clip",
            EditCommand::SplitClip { .. } => "Split clip",
            EditCommand::MergeClips { .. } => "Merge clips",
            EditCommand::SetGroup { group_id: Some(_), .. } => "Group clips",
            EditCommand::SetGroup { group_id: None, .. } => "Ungroup clips",
            EditCommand::SetZoom { .. } => "Zoom",
            EditCommand::SetTotalDuration { .. } => "Set duration",
        }
    }

    /// Whether the command changes clip or track content (as opposed to
    /// view state such as zoom). Only content changes are worth an undo step.
    pub fn is_content_edit(&self) -> bool {
        !matches!(self, EditCommand::SetZoom { .. })
    }
}

impl Project {
    /// Apply a command. On error the project is left unchanged.
    pub fn apply(&mut self, command: EditCommand) -> Result<CommandOutcome, ProjectError> {
        tracing::trace!(command = command.label(), "Applying edit command");
        match command {
            EditCommand::AddTrack { kind, name } => {
                let id = match name {
                    Some(name) => self.add_named_track(kind, name),
                    None => self.add_track(kind),
                };
                Ok(CommandOutcome::TrackAdded(id))
            }
            EditCommand::RemoveTrack { track_id } => {
                self.remove_track(track_id).map(CommandOutcome::TrackRemoved)
            }
            EditCommand::ReorderTrack { from, to } => {
                self.reorder_track(from, to).map(|_| CommandOutcome::Applied)
            }
            EditCommand::SwapTracks { a, b } => {
                self.swap_tracks(a, b).map(|_| CommandOutcome::Applied)
            }
            EditCommand::RenameTrack { track_id, name } => self
                .rename_track(track_id, name)
                .map(|_| CommandOutcome::Applied),
            EditCommand::AddClip {
                track_id,
                asset_id,
                start_secs,
                group_id,
            } => self
                .add_clip(track_id, asset_id, start_secs, group_id)
                .map(CommandOutcome::ClipAdded),
            EditCommand::MoveClips { moves } => {
                self.move_clips(&moves).map(|_| CommandOutcome::Applied)
            }
            EditCommand::ResizeClip {
                clip_id,
                duration_secs,
            } => self
                .resize_clip(clip_id, duration_secs)
                .map(|_| CommandOutcome::Applied),
            EditCommand::SetClipLevel { clip_id, level } => self
                .set_clip_level(clip_id, level)
                .map(|_| CommandOutcome::Applied),
            EditCommand::SetClipMuted { clip_id, muted } => self
                .set_clip_muted(clip_id, muted)
                .map(|_| CommandOutcome::Applied),
            EditCommand::DeleteClip { clip_id } => {
                self.delete_clip(clip_id).map(CommandOutcome::ClipRemoved)
            }
            EditCommand::SplitClip { clip_id, at_secs } => self
                .split_clip(clip_id, at_secs)
                .map(|created| CommandOutcome::ClipSplit {
                    original: clip_id,
                    created,
                }),
            EditCommand::MergeClips { left, right } => self
                .merge_clips(left, right)
                .map(|_| CommandOutcome::Applied),
            EditCommand::SetGroup { clip_ids, group_id } => self
                .set_group(&clip_ids, group_id)
                .map(|_| CommandOutcome::Applied),
            EditCommand::SetZoom { pixels_per_second } => self
                .set_zoom(pixels_per_second)
                .map(|_| CommandOutcome::Applied),
            EditCommand::SetTotalDuration { secs } => self
                .set_total_duration(secs)
                .map(|_| CommandOutcome::Applied),
        }
    }
}
