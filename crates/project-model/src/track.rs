//! Tracks and the clips placed on them.

use serde::{Deserialize, Serialize};

use crate::asset::MediaKind;
use crate::ids::{AssetId, ClipId, GroupId, TrackId};

/// A placement of (part of) an asset on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,

    /// Referenced asset. The clip does not own it.
    pub asset_id: AssetId,

    /// Track currently holding this clip.
    pub track_id: TrackId,

    /// Timeline position of the leading edge (seconds, >= 0).
    pub start_secs: f64,

    /// Length on the timeline (seconds, > 0). May exceed the asset length,
    /// in which case the asset loops.
    pub duration_secs: f64,

    /// Offset into the asset where playback of this clip begins.
    #[serde(default)]
    pub source_offset_secs: f64,

    /// Opacity for video, volume for audio, in `[0.0, 1.0]`.
    #[serde(default = "default_level")]
    pub level: f64,

    #[serde(default)]
    pub muted: bool,

    /// Clips sharing a group move and select together.
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

fn default_level() -> f64 {
    1.0
}

impl Clip {
    /// Timeline position of the trailing edge.
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Whether `time_secs` falls inside `[start, start + duration)`.
    pub fn contains(&self, time_secs: f64) -> bool {
        time_secs >= self.start_secs && time_secs < self.end_secs()
    }

    /// Position within the source media at a timeline time, before looping.
    pub fn media_time_at(&self, time_secs: f64) -> f64 {
        time_secs - self.start_secs + self.source_offset_secs
    }
}

/// An ordered lane of clips of a single media kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,

    pub kind: MediaKind,

    pub name: String,

    /// Position in the project's track list. Kept equal to the index by the
    /// project's mutators.
    pub order_index: usize,

    /// Clips in insertion order. Overlap is allowed.
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(id: TrackId, kind: MediaKind, name: impl Into<String>, order_index: usize) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            order_index,
            clips: Vec::new(),
        }
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub fn position_of(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    /// The clip playing at `time_secs` on this track.
    ///
    /// When clips on the same track overlap, the most recently inserted one
    /// is on top.
    pub fn clip_at(&self, time_secs: f64) -> Option<&Clip> {
        self.clips.iter().rev().find(|c| c.contains(time_secs))
    }

    /// Latest trailing edge among this track's clips.
    pub fn end_secs(&self) -> f64 {
        self.clips.iter().map(Clip::end_secs).fold(0.0, f64::max)
    }
}
