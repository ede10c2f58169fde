//! Imported media assets.
//!
//! An asset is owned by the project and referenced by id from any number
//! of clips. Assets start out `processing` while the importer resolves
//! their true duration, and become `ready` once it succeeds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

/// Kind of media carried by an asset and accepted by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// Import status of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    #[default]
    Processing,
    Ready,
}

/// Opaque reference to the asset's media, understood by the transcoder and
/// preview surfaces (usually a file path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceHandle(pub String);

impl SourceHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A media asset available to the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,

    /// Display name (usually the file name).
    pub name: String,

    pub media_type: MediaKind,

    pub source: SourceHandle,

    /// Natural length of the media in seconds. Always positive.
    pub base_duration_secs: f64,

    #[serde(default)]
    pub ready_state: ReadyState,
}

impl Asset {
    pub fn is_ready(&self) -> bool {
        self.ready_state == ReadyState::Ready
    }

    /// Number of repetitions needed to fill `duration_secs` of timeline.
    ///
    /// Clips longer than their asset loop it; a clip never needs fewer
    /// than one repetition.
    pub fn loop_count(&self, duration_secs: f64) -> u32 {
        if self.base_duration_secs <= 0.0 {
            return 1;
        }
        ((duration_secs / self.base_duration_secs).ceil() as u32).max(1)
    }

    /// Map a position measured from the start of the media onto the asset,
    /// wrapping around once it runs past the end.
    pub fn wrap_media_time(&self, media_secs: f64) -> f64 {
        if self.base_duration_secs > 0.0 && media_secs >= self.base_duration_secs {
            media_secs.rem_euclid(self.base_duration_secs)
        } else {
            media_secs
        }
    }
}
