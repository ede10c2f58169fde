//! Project container and its invariant-preserving mutators.
//!
//! A project owns its assets and tracks; tracks own their clips. Every
//! mutator validates all of its inputs before touching any state, so a
//! returned error always means nothing changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, MediaKind, ReadyState, SourceHandle};
use crate::command::ClipMove;
use crate::ids::{AssetId, ClipId, GroupId, IdAllocator, TrackId};
use crate::track::{Clip, Track};

/// Schema version written into new projects.
pub const PROJECT_SCHEMA_VERSION: &str = "1.0";

/// Default zoom for new projects, in pixels per second.
pub const DEFAULT_PIXELS_PER_SECOND: f64 = 100.0;

/// Default ruler length for new projects.
pub const DEFAULT_TOTAL_DURATION_SECS: f64 = 60.0;

/// Top-level project (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Tracks in stacking order; `tracks[i].order_index == i`.
    #[serde(default)]
    tracks: Vec<Track>,

    #[serde(default)]
    assets: BTreeMap<AssetId, Asset>,

    /// Timeline zoom in pixels per second.
    pub zoom_factor: f64,

    /// Ruler length. A soft bound: clips may extend past it.
    pub total_duration_secs: f64,

    /// Playhead position.
    #[serde(default)]
    pub current_time_secs: f64,

    #[serde(default)]
    ids: IdAllocator,
}

/// Errors raised by project mutators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectError {
    #[error("Cannot place {asset_kind} asset {asset_id} on {track_kind} track {track_id}")]
    IncompatibleAssetKind {
        asset_id: AssetId,
        asset_kind: MediaKind,
        track_id: TrackId,
        track_kind: MediaKind,
    },

    #[error("Split point {at_secs:.3}s is not inside clip {clip_id} ({start_secs:.3}s..{end_secs:.3}s)")]
    InvalidSplitPoint {
        clip_id: ClipId,
        at_secs: f64,
        start_secs: f64,
        end_secs: f64,
    },

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Clip not found: {0}")]
    ClipNotFound(ClipId),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Asset {asset_id} is still referenced by {clips} clip(s)")]
    AssetInUse { asset_id: AssetId, clips: usize },

    #[error("Grouping needs at least two clips, got {count}")]
    InvalidGroup { count: usize },

    #[error("Track index {index} is out of range ({len} tracks)")]
    InvalidTrackIndex { index: usize, len: usize },

    #[error("Clips {left} and {right} cannot be merged: {reason}")]
    InvalidMerge {
        left: ClipId,
        right: ClipId,
        reason: String,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

impl ProjectError {
    fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<ProjectError> for montage_common::MontageError {
    fn from(err: ProjectError) -> Self {
        montage_common::MontageError::project(err.to_string())
    }
}

type Result<T> = std::result::Result<T, ProjectError>;

const MERGE_TOLERANCE_SECS: f64 = 1e-6;

impl Project {
    /// Create an empty project with default zoom and ruler length.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_timeline(name, DEFAULT_PIXELS_PER_SECOND, DEFAULT_TOTAL_DURATION_SECS)
    }

    /// Create an empty project with explicit zoom and ruler length.
    pub fn with_timeline(
        name: impl Into<String>,
        pixels_per_second: f64,
        total_duration_secs: f64,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: PROJECT_SCHEMA_VERSION.to_string(),
            name: name.into(),
            id: uuid_v4(),
            created_at: now.clone(),
            modified_at: now,
            tracks: Vec::new(),
            assets: BTreeMap::new(),
            zoom_factor: if pixels_per_second > 0.0 {
                pixels_per_second
            } else {
                DEFAULT_PIXELS_PER_SECOND
            },
            total_duration_secs: total_duration_secs.max(0.0),
            current_time_secs: 0.0,
            ids: IdAllocator::default(),
        }
    }

    /// Update the modification timestamp.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }

    /// Re-establish derived state after deserialization: the id counter is
    /// advanced past every stored id and track order indices are renumbered.
    pub fn after_load(&mut self) {
        let mut max_id = 0;
        for asset in self.assets.values() {
            max_id = max_id.max(asset.id.0);
        }
        for track in &self.tracks {
            max_id = max_id.max(track.id.0);
            for clip in &track.clips {
                max_id = max_id.max(clip.id.0);
                if let Some(group) = clip.group_id {
                    max_id = max_id.max(group.0);
                }
            }
        }
        self.ids.observe(max_id);
        self.renumber_tracks();
    }

    /// Adopt `current`'s asset library and id counter.
    ///
    /// Used when a history snapshot replaces the live project: imports are
    /// not undoable, so readiness and newly imported assets survive. Assets
    /// the snapshot's clips still reference but `current` no longer has are
    /// kept from the snapshot.
    pub fn adopt_library(&mut self, current: &Project) {
        let mut assets = current.assets.clone();
        for (id, asset) in &self.assets {
            if !assets.contains_key(id) && self.clips().any(|c| c.asset_id == *id) {
                assets.insert(*id, asset.clone());
            }
        }
        self.assets = assets;
        self.ids = current.ids.clone();
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Tracks in stacking order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    /// Every clip in the project, track by track.
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|t| t.clips.iter())
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.locate_clip(id)
            .map(|(ti, ci)| &self.tracks[ti].clips[ci])
    }

    /// The track currently holding a clip.
    pub fn clip_track(&self, id: ClipId) -> Option<&Track> {
        self.locate_clip(id).map(|(ti, _)| &self.tracks[ti])
    }

    /// Ids of all clips in a group, in track order.
    pub fn group_members(&self, group: GroupId) -> Vec<ClipId> {
        self.clips()
            .filter(|c| c.group_id == Some(group))
            .map(|c| c.id)
            .collect()
    }

    /// Number of clips that reference an asset.
    pub fn clips_using_asset(&self, asset_id: AssetId) -> usize {
        self.clips().filter(|c| c.asset_id == asset_id).count()
    }

    /// Latest trailing edge of any clip.
    pub fn content_end_secs(&self) -> f64 {
        self.tracks.iter().map(Track::end_secs).fold(0.0, f64::max)
    }

    // ── Assets ──────────────────────────────────────────────────────────

    /// Register an asset and return its id.
    pub fn add_asset(
        &mut self,
        name: impl Into<String>,
        media_type: MediaKind,
        source: SourceHandle,
        base_duration_secs: f64,
        ready_state: ReadyState,
    ) -> Result<AssetId> {
        if !(base_duration_secs.is_finite() && base_duration_secs > 0.0) {
            return Err(ProjectError::validation(format!(
                "asset duration must be positive, got {base_duration_secs}"
            )));
        }
        let id = AssetId(self.ids.next_raw());
        self.assets.insert(
            id,
            Asset {
                id,
                name: name.into(),
                media_type,
                source,
                base_duration_secs,
                ready_state,
            },
        );
        self.touch();
        Ok(id)
    }

    /// Record the probed duration of an asset and mark it ready.
    pub fn resolve_asset(&mut self, id: AssetId, base_duration_secs: f64) -> Result<()> {
        if !(base_duration_secs.is_finite() && base_duration_secs > 0.0) {
            return Err(ProjectError::validation(format!(
                "resolved duration must be positive, got {base_duration_secs}"
            )));
        }
        let asset = self
            .assets
            .get_mut(&id)
            .ok_or(ProjectError::AssetNotFound(id))?;
        asset.base_duration_secs = base_duration_secs;
        asset.ready_state = ReadyState::Ready;
        tracing::debug!(asset = %id, duration_secs = base_duration_secs, "Asset resolved");
        Ok(())
    }

    /// Remove an asset that no clip references.
    pub fn remove_asset(&mut self, id: AssetId) -> Result<Asset> {
        if !self.assets.contains_key(&id) {
            return Err(ProjectError::AssetNotFound(id));
        }
        let clips = self.clips_using_asset(id);
        if clips > 0 {
            return Err(ProjectError::AssetInUse { asset_id: id, clips });
        }
        let asset = self
            .assets
            .remove(&id)
            .ok_or(ProjectError::AssetNotFound(id))?;
        self.touch();
        Ok(asset)
    }

    // ── Tracks ──────────────────────────────────────────────────────────

    /// Append a track with a generated name such as "Video 2".
    pub fn add_track(&mut self, kind: MediaKind) -> TrackId {
        let same_kind = self.tracks.iter().filter(|t| t.kind == kind).count();
        let label = match kind {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        };
        self.add_named_track(kind, format!("{label} {}", same_kind + 1))
    }

    /// Append a track with an explicit name.
    pub fn add_named_track(&mut self, kind: MediaKind, name: impl Into<String>) -> TrackId {
        let id = TrackId(self.ids.next_raw());
        let order_index = self.tracks.len();
        self.tracks.push(Track::new(id, kind, name, order_index));
        self.touch();
        tracing::debug!(track = %id, %kind, "Track added");
        id
    }

    /// Remove a track together with all of its clips.
    pub fn remove_track(&mut self, id: TrackId) -> Result<Track> {
        let index = self.track_index(id).ok_or(ProjectError::TrackNotFound(id))?;
        let track = self.tracks.remove(index);
        self.renumber_tracks();
        self.touch();
        tracing::debug!(track = %id, clips = track.clips.len(), "Track removed");
        Ok(track)
    }

    /// Move the track at `from` so that it ends up at index `to`.
    pub fn reorder_track(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.tracks.len();
        for index in [from, to] {
            if index >= len {
                return Err(ProjectError::InvalidTrackIndex { index, len });
            }
        }
        if from != to {
            let track = self.tracks.remove(from);
            self.tracks.insert(to, track);
            self.renumber_tracks();
            self.touch();
        }
        Ok(())
    }

    /// Exchange the stacking positions of two tracks.
    pub fn swap_tracks(&mut self, a: TrackId, b: TrackId) -> Result<()> {
        let ia = self.track_index(a).ok_or(ProjectError::TrackNotFound(a))?;
        let ib = self.track_index(b).ok_or(ProjectError::TrackNotFound(b))?;
        if ia != ib {
            self.tracks.swap(ia, ib);
            self.renumber_tracks();
            self.touch();
        }
        Ok(())
    }

    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> Result<()> {
        let index = self.track_index(id).ok_or(ProjectError::TrackNotFound(id))?;
        self.tracks[index].name = name.into();
        self.touch();
        Ok(())
    }

    // ── Clips ───────────────────────────────────────────────────────────

    /// Place an asset on a track. The clip spans the asset's base duration.
    pub fn add_clip(
        &mut self,
        track_id: TrackId,
        asset_id: AssetId,
        start_secs: f64,
        group_id: Option<GroupId>,
    ) -> Result<ClipId> {
        let track_index = self
            .track_index(track_id)
            .ok_or(ProjectError::TrackNotFound(track_id))?;
        let asset = self
            .assets
            .get(&asset_id)
            .ok_or(ProjectError::AssetNotFound(asset_id))?;
        let track_kind = self.tracks[track_index].kind;
        if asset.media_type != track_kind {
            return Err(ProjectError::IncompatibleAssetKind {
                asset_id,
                asset_kind: asset.media_type,
                track_id,
                track_kind,
            });
        }
        if !start_secs.is_finite() {
            return Err(ProjectError::validation("clip start must be finite"));
        }

        let duration_secs = asset.base_duration_secs;
        let id = ClipId(self.ids.next_raw());
        if let Some(group) = group_id {
            self.ids.observe(group.0);
        }
        self.tracks[track_index].clips.push(Clip {
            id,
            asset_id,
            track_id,
            start_secs: start_secs.max(0.0),
            duration_secs,
            source_offset_secs: 0.0,
            level: 1.0,
            muted: false,
            group_id,
        });
        self.touch();
        tracing::debug!(clip = %id, track = %track_id, asset = %asset_id, "Clip added");
        Ok(id)
    }

    /// Reposition a single clip, optionally moving it to another track.
    pub fn move_clip(
        &mut self,
        clip_id: ClipId,
        start_secs: f64,
        track_id: Option<TrackId>,
    ) -> Result<()> {
        self.move_clips(&[ClipMove {
            clip_id,
            start_secs,
            track_id,
        }])
    }

    /// Apply several moves at once. Either all of them apply or none does.
    pub fn move_clips(&mut self, moves: &[ClipMove]) -> Result<()> {
        for mv in moves {
            let (ti, ci) = self
                .locate_clip(mv.clip_id)
                .ok_or(ProjectError::ClipNotFound(mv.clip_id))?;
            if !mv.start_secs.is_finite() {
                return Err(ProjectError::validation("clip start must be finite"));
            }
            if let Some(target) = mv.track_id {
                let target_index = self
                    .track_index(target)
                    .ok_or(ProjectError::TrackNotFound(target))?;
                let source = &self.tracks[ti];
                let target_kind = self.tracks[target_index].kind;
                if source.kind != target_kind {
                    return Err(ProjectError::IncompatibleAssetKind {
                        asset_id: source.clips[ci].asset_id,
                        asset_kind: source.kind,
                        track_id: target,
                        track_kind: target_kind,
                    });
                }
            }
        }

        for mv in moves {
            let Some((ti, ci)) = self.locate_clip(mv.clip_id) else {
                continue;
            };
            let start_secs = mv.start_secs.max(0.0);
            match mv.track_id {
                Some(target) if target != self.tracks[ti].id => {
                    let mut clip = self.tracks[ti].clips.remove(ci);
                    clip.start_secs = start_secs;
                    clip.track_id = target;
                    if let Some(target_index) = self.track_index(target) {
                        self.tracks[target_index].clips.push(clip);
                    }
                }
                _ => self.tracks[ti].clips[ci].start_secs = start_secs,
            }
        }
        if !moves.is_empty() {
            self.touch();
        }
        Ok(())
    }

    /// Change a clip's length, keeping its leading edge.
    pub fn resize_clip(&mut self, clip_id: ClipId, duration_secs: f64) -> Result<()> {
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(ProjectError::validation(format!(
                "clip duration must be positive, got {duration_secs}"
            )));
        }
        let clip = self.clip_mut(clip_id)?;
        clip.duration_secs = duration_secs;
        self.touch();
        Ok(())
    }

    /// Set opacity/volume, clamped to `[0.0, 1.0]`.
    pub fn set_clip_level(&mut self, clip_id: ClipId, level: f64) -> Result<()> {
        if level.is_nan() {
            return Err(ProjectError::validation("clip level must be a number"));
        }
        let clip = self.clip_mut(clip_id)?;
        clip.level = level.clamp(0.0, 1.0);
        self.touch();
        Ok(())
    }

    pub fn set_clip_muted(&mut self, clip_id: ClipId, muted: bool) -> Result<()> {
        let clip = self.clip_mut(clip_id)?;
        clip.muted = muted;
        self.touch();
        Ok(())
    }

    /// Remove a clip from its track.
    pub fn delete_clip(&mut self, clip_id: ClipId) -> Result<Clip> {
        let (ti, ci) = self
            .locate_clip(clip_id)
            .ok_or(ProjectError::ClipNotFound(clip_id))?;
        let clip = self.tracks[ti].clips.remove(ci);
        self.touch();
        tracing::debug!(clip = %clip_id, track = %clip.track_id, "Clip deleted");
        Ok(clip)
    }

    /// Cut a clip in two at `at_secs` and return the id of the new right-hand piece.
    ///
    /// The original keeps its leading part; the new clip covers the remainder,
    /// starts reading the source further in by the same amount, and stays in
    /// the original's group.
    pub fn split_clip(&mut self, clip_id: ClipId, at_secs: f64) -> Result<ClipId> {
        let (ti, ci) = self
            .locate_clip(clip_id)
            .ok_or(ProjectError::ClipNotFound(clip_id))?;
        let original = &self.tracks[ti].clips[ci];
        if !(original.start_secs < at_secs && at_secs < original.end_secs()) {
            return Err(ProjectError::InvalidSplitPoint {
                clip_id,
                at_secs,
                start_secs: original.start_secs,
                end_secs: original.end_secs(),
            });
        }

        let head = at_secs - original.start_secs;
        let tail = original.duration_secs - head;
        let id = ClipId(self.ids.next_raw());
        let right = Clip {
            id,
            start_secs: at_secs,
            duration_secs: tail,
            source_offset_secs: original.source_offset_secs + head,
            ..original.clone()
        };

        self.tracks[ti].clips[ci].duration_secs = head;
        self.tracks[ti].clips.insert(ci + 1, right);
        self.touch();
        tracing::debug!(clip = %clip_id, created = %id, at_secs, "Clip split");
        Ok(id)
    }

    /// Join the two halves of a previous split back into `left`, deleting `right`.
    pub fn merge_clips(&mut self, left: ClipId, right: ClipId) -> Result<()> {
        let l = self.clip(left).ok_or(ProjectError::ClipNotFound(left))?;
        let r = self.clip(right).ok_or(ProjectError::ClipNotFound(right))?;
        let reject = |reason: &str| ProjectError::InvalidMerge {
            left,
            right,
            reason: reason.to_string(),
        };
        if left == right {
            return Err(reject("a clip cannot be merged with itself"));
        }
        if l.track_id != r.track_id {
            return Err(reject("clips are on different tracks"));
        }
        if l.asset_id != r.asset_id {
            return Err(reject("clips reference different assets"));
        }
        if (r.start_secs - l.end_secs()).abs() > MERGE_TOLERANCE_SECS {
            return Err(reject("clips are not adjacent"));
        }
        if (r.source_offset_secs - (l.source_offset_secs + l.duration_secs)).abs()
            > MERGE_TOLERANCE_SECS
        {
            return Err(reject("source ranges are not contiguous"));
        }

        let combined = l.duration_secs + r.duration_secs;
        self.delete_clip(right)?;
        self.clip_mut(left)?.duration_secs = combined;
        self.touch();
        Ok(())
    }

    // ── Groups ──────────────────────────────────────────────────────────

    /// Reserve a fresh group id.
    pub fn allocate_group_id(&mut self) -> GroupId {
        GroupId(self.ids.next_raw())
    }

    /// Assign (or clear, with `None`) the group of several clips.
    pub fn set_group(&mut self, clip_ids: &[ClipId], group_id: Option<GroupId>) -> Result<()> {
        for id in clip_ids {
            if self.locate_clip(*id).is_none() {
                return Err(ProjectError::ClipNotFound(*id));
            }
        }
        if let Some(group) = group_id {
            self.ids.observe(group.0);
        }
        for id in clip_ids {
            self.clip_mut(*id)?.group_id = group_id;
        }
        self.touch();
        Ok(())
    }

    // ── Timeline view ───────────────────────────────────────────────────

    pub fn set_zoom(&mut self, pixels_per_second: f64) -> Result<()> {
        if !(pixels_per_second.is_finite() && pixels_per_second > 0.0) {
            return Err(ProjectError::validation("zoom factor must be positive"));
        }
        self.zoom_factor = pixels_per_second;
        Ok(())
    }

    pub fn set_total_duration(&mut self, secs: f64) -> Result<()> {
        if !(secs.is_finite() && secs >= 0.0) {
            return Err(ProjectError::validation("total duration must be non-negative"));
        }
        self.total_duration_secs = secs;
        self.touch();
        Ok(())
    }

    /// Move the playhead. Negative times are clamped to zero.
    pub fn set_current_time(&mut self, secs: f64) {
        self.current_time_secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    }

    // ── Validation ──────────────────────────────────────────────────────

    /// Describe every broken invariant. An empty list means the project is sound.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        for (index, track) in self.tracks.iter().enumerate() {
            if track.order_index != index {
                errors.push(format!(
                    "{} has order index {} at position {index}",
                    track.id, track.order_index
                ));
            }
            for clip in &track.clips {
                if clip.track_id != track.id {
                    errors.push(format!(
                        "{} is stored on {} but claims {}",
                        clip.id, track.id, clip.track_id
                    ));
                }
                match self.assets.get(&clip.asset_id) {
                    None => errors.push(format!(
                        "{} references missing {}",
                        clip.id, clip.asset_id
                    )),
                    Some(asset) if asset.media_type != track.kind => errors.push(format!(
                        "{} places {} media on {} track {}",
                        clip.id, asset.media_type, track.kind, track.id
                    )),
                    Some(_) => {}
                }
                if !(clip.duration_secs > 0.0) {
                    errors.push(format!("{} has non-positive duration", clip.id));
                }
                if clip.start_secs < 0.0 {
                    errors.push(format!("{} starts before zero", clip.id));
                }
                if clip.source_offset_secs < 0.0 {
                    errors.push(format!("{} has a negative source offset", clip.id));
                }
                if !(0.0..=1.0).contains(&clip.level) {
                    errors.push(format!("{} has level {} outside [0, 1]", clip.id, clip.level));
                }
            }
        }

        for asset in self.assets.values() {
            if !(asset.base_duration_secs > 0.0) {
                errors.push(format!("{} has non-positive duration", asset.id));
            }
        }

        if !(self.zoom_factor > 0.0) {
            errors.push("zoom factor must be positive".to_string());
        }

        errors
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn locate_clip(&self, id: ClipId) -> Option<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(ti, t)| t.position_of(id).map(|ci| (ti, ci)))
    }

    fn clip_mut(&mut self, id: ClipId) -> Result<&mut Clip> {
        let (ti, ci) = self.locate_clip(id).ok_or(ProjectError::ClipNotFound(id))?;
        Ok(&mut self.tracks[ti].clips[ci])
    }

    fn renumber_tracks(&mut self) {
        for (index, track) in self.tracks.iter_mut().enumerate() {
            track.order_index = index;
        }
    }
}

/// Generate a simple UUID v4 without external dependency.
///
/// The clock alone repeats within one tick, so a process-wide counter is
/// mixed into the seed.
fn uuid_v4() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed) as u128;
    let pid = std::process::id() as u128;
    let seed = nanos ^ (count << 64) ^ (pid << 96) ^ count.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFFFFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3F) | 0x80) as u16 | (((seed >> 66) & 0x3FF) as u16) << 6,
        (seed >> 76) & 0xFFFFFFFFFFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_asset(project: &mut Project, kind: MediaKind, secs: f64) -> AssetId {
        project
            .add_asset(
                "media",
                kind,
                SourceHandle::new("/media/source"),
                secs,
                ReadyState::Ready,
            )
            .unwrap()
    }

    #[test]
    fn test_project_creation() {
        let project = Project::new("Demo");
        assert_eq!(project.name, "Demo");
        assert_eq!(project.version, PROJECT_SCHEMA_VERSION);
        assert!(project.tracks().is_empty());
        assert!((project.zoom_factor - DEFAULT_PIXELS_PER_SECOND).abs() < 1e-9);
    }

    #[test]
    fn test_add_track_names_by_kind() {
        let mut project = Project::new("Demo");
        let v1 = project.add_track(MediaKind::Video);
        let a1 = project.add_track(MediaKind::Audio);
        let v2 = project.add_track(MediaKind::Video);
        assert_eq!(project.track(v1).unwrap().name, "Video 1");
        assert_eq!(project.track(a1).unwrap().name, "Audio 1");
        assert_eq!(project.track(v2).unwrap().name, "Video 2");
        assert_eq!(project.track(v2).unwrap().order_index, 2);
    }

    #[test]
    fn test_add_clip_rejects_mismatched_kind() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let audio = ready_asset(&mut project, MediaKind::Audio, 3.0);

        let err = project.add_clip(video, audio, 0.0, None).unwrap_err();
        assert!(matches!(err, ProjectError::IncompatibleAssetKind { .. }));
        assert!(project.track(video).unwrap().clips.is_empty());
    }

    #[test]
    fn test_add_clip_uses_asset_duration() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 7.5);
        let clip = project.add_clip(video, asset, 2.0, None).unwrap();
        let clip = project.clip(clip).unwrap();
        assert!((clip.duration_secs - 7.5).abs() < 1e-9);
        assert!((clip.start_secs - 2.0).abs() < 1e-9);
        assert!((clip.level - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_clip_divides_duration_and_advances_offset() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 8.0);
        let group = project.allocate_group_id();
        let clip = project.add_clip(video, asset, 2.0, Some(group)).unwrap();

        let created = project.split_clip(clip, 5.0).unwrap();
        let left = project.clip(clip).unwrap();
        let right = project.clip(created).unwrap();
        assert_eq!(left.duration_secs, 3.0);
        assert_eq!(right.duration_secs, 5.0);
        assert_eq!(right.start_secs, 5.0);
        assert_eq!(right.source_offset_secs, 3.0);
        assert_eq!(right.group_id, Some(group));
        // The new piece sits right after the original
        let track = project.track(video).unwrap();
        assert_eq!(track.position_of(created), Some(1));
    }

    #[test]
    fn test_split_rejects_edges() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 4.0);
        let clip = project.add_clip(video, asset, 1.0, None).unwrap();

        for at in [1.0, 5.0, 0.5, 6.0] {
            let err = project.split_clip(clip, at).unwrap_err();
            assert!(matches!(err, ProjectError::InvalidSplitPoint { .. }));
        }
        assert_eq!(project.track(video).unwrap().clips.len(), 1);
    }

    #[test]
    fn test_merge_undoes_split() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 6.0);
        let clip = project.add_clip(video, asset, 0.0, None).unwrap();
        let right = project.split_clip(clip, 2.5).unwrap();

        project.merge_clips(clip, right).unwrap();
        let track = project.track(video).unwrap();
        assert_eq!(track.clips.len(), 1);
        assert!((track.clips[0].duration_secs - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_rejects_non_adjacent() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let a = project.add_clip(video, asset, 0.0, None).unwrap();
        let b = project.add_clip(video, asset, 5.0, None).unwrap();
        let err = project.merge_clips(a, b).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidMerge { .. }));
        assert_eq!(project.track(video).unwrap().clips.len(), 2);
    }

    #[test]
    fn test_move_clips_is_all_or_nothing() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let audio_track = project.add_track(MediaKind::Audio);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let a = project.add_clip(video, asset, 0.0, None).unwrap();
        let b = project.add_clip(video, asset, 3.0, None).unwrap();

        let err = project
            .move_clips(&[
                ClipMove::new(a, 1.0, None),
                ClipMove::new(b, 4.0, Some(audio_track)),
            ])
            .unwrap_err();
        assert!(matches!(err, ProjectError::IncompatibleAssetKind { .. }));
        assert_eq!(project.clip(a).unwrap().start_secs, 0.0);
        assert_eq!(project.clip(b).unwrap().start_secs, 3.0);
    }

    #[test]
    fn test_move_clip_across_tracks() {
        let mut project = Project::new("Demo");
        let v1 = project.add_track(MediaKind::Video);
        let v2 = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let clip = project.add_clip(v1, asset, 0.0, None).unwrap();

        project.move_clip(clip, -3.0, Some(v2)).unwrap();
        assert!(project.track(v1).unwrap().clips.is_empty());
        let moved = project.clip(clip).unwrap();
        assert_eq!(moved.track_id, v2);
        assert_eq!(moved.start_secs, 0.0);
    }

    #[test]
    fn test_remove_track_cascades_and_renumbers() {
        let mut project = Project::new("Demo");
        let v1 = project.add_track(MediaKind::Video);
        let v2 = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let clip = project.add_clip(v1, asset, 0.0, None).unwrap();

        let removed = project.remove_track(v1).unwrap();
        assert_eq!(removed.clips.len(), 1);
        assert!(project.clip(clip).is_none());
        assert_eq!(project.track(v2).unwrap().order_index, 0);
    }

    #[test]
    fn test_reorder_and_swap_tracks() {
        let mut project = Project::new("Demo");
        let a = project.add_track(MediaKind::Video);
        let b = project.add_track(MediaKind::Video);
        let c = project.add_track(MediaKind::Audio);

        project.reorder_track(0, 2).unwrap();
        let order: Vec<_> = project.tracks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![b, c, a]);

        project.swap_tracks(b, a).unwrap();
        let order: Vec<_> = project.tracks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![a, c, b]);
        assert!(project
            .tracks()
            .iter()
            .enumerate()
            .all(|(i, t)| t.order_index == i));

        let err = project.reorder_track(0, 3).unwrap_err();
        assert_eq!(err, ProjectError::InvalidTrackIndex { index: 3, len: 3 });
    }

    #[test]
    fn test_remove_asset_in_use_is_rejected() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let clip = project.add_clip(video, asset, 0.0, None).unwrap();

        let err = project.remove_asset(asset).unwrap_err();
        assert_eq!(
            err,
            ProjectError::AssetInUse {
                asset_id: asset,
                clips: 1
            }
        );
        project.delete_clip(clip).unwrap();
        assert!(project.remove_asset(asset).is_ok());
    }

    #[test]
    fn test_level_is_clamped() {
        let mut project = Project::new("Demo");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let clip = project.add_clip(video, asset, 0.0, None).unwrap();
        project.set_clip_level(clip, 1.7).unwrap();
        assert_eq!(project.clip(clip).unwrap().level, 1.0);
        project.set_clip_level(clip, -0.2).unwrap();
        assert_eq!(project.clip(clip).unwrap().level, 0.0);
    }

    #[test]
    fn test_serialization_round_trip_keeps_id_counter() {
        let mut project = Project::new("Persisted");
        let video = project.add_track(MediaKind::Video);
        let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
        let clip = project.add_clip(video, asset, 0.0, None).unwrap();

        let json = serde_json::to_string_pretty(&project).unwrap();
        let mut parsed: Project = serde_json::from_str(&json).unwrap();
        parsed.after_load();

        assert_eq!(parsed.clip(clip).unwrap().asset_id, asset);
        let next = parsed.add_track(MediaKind::Audio);
        assert!(next.0 > clip.0);
        assert!(parsed.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_asset() {
        let mut value = {
            let mut project = Project::new("Broken");
            let video = project.add_track(MediaKind::Video);
            let asset = ready_asset(&mut project, MediaKind::Video, 2.0);
            project.add_clip(video, asset, 0.0, None).unwrap();
            serde_json::to_value(project).unwrap()
        };
        value["assets"] = serde_json::json!({});
        let parsed: Project = serde_json::from_value(value).unwrap();
        let errors = parsed.validate();
        assert!(errors.iter().any(|e| e.contains("references missing")));
    }

    #[test]
    fn test_projects_created_together_get_distinct_ids() {
        let ids: std::collections::HashSet<String> =
            (0..64).map(|_| Project::new("Same tick").id).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn test_adopt_library_keeps_live_assets_and_counter() {
        let mut live = Project::new("Live");
        let video = live.add_track(MediaKind::Video);
        let pending = live
            .add_asset(
                "slow.mp4",
                MediaKind::Video,
                SourceHandle::new("slow.mp4"),
                1.0,
                ReadyState::Processing,
            )
            .unwrap();
        live.add_clip(video, pending, 0.0, None).unwrap();
        let snapshot = live.clone();

        live.resolve_asset(pending, 6.0).unwrap();
        let later = ready_asset(&mut live, MediaKind::Video, 2.0);

        let mut restored = snapshot;
        restored.adopt_library(&live);
        assert!(restored.asset(pending).unwrap().is_ready());
        assert!(restored.asset(later).is_some());
        let next = restored.add_track(MediaKind::Audio);
        assert!(next.0 > later.0);
    }

    #[test]
    fn test_adopt_library_keeps_assets_snapshot_clips_need() {
        let mut live = Project::new("Live");
        let video = live.add_track(MediaKind::Video);
        let asset = ready_asset(&mut live, MediaKind::Video, 2.0);
        let clip = live.add_clip(video, asset, 0.0, None).unwrap();
        let snapshot = live.clone();

        live.delete_clip(clip).unwrap();
        live.remove_asset(asset).unwrap();

        let mut restored = snapshot;
        restored.adopt_library(&live);
        assert!(restored.asset(asset).is_some());
        assert!(restored.validate().is_empty());
    }
}
