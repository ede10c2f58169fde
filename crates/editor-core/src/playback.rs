//! Playhead-driven preview synchronization.
//!
//! The synchronizer owns the transport state and advances the project's
//! playhead. On every tick and seek it resolves the active clip per media
//! kind and drives the attached [`PreviewSurface`]s: a surface is handed a
//! new source only when its active clip changes, follows play/pause, and is
//! force-seeked when its reported position drifts past the tolerance.
//!
//! Ticks only ever change `current_time_secs`; clip geometry is read, never
//! written.

use montage_common::clock::DriftMeasurement;
use montage_project_model::{AssetId, ClipId, MediaKind, Project, SourceHandle, TrackId};
use serde::Serialize;

/// A rendering target for one media kind (a video element, an audio sink).
pub trait PreviewSurface: Send {
    /// Load the media of `clip`, or unload with `None`.
    fn set_source(&mut self, clip: Option<&ActiveClip>);

    fn play(&mut self);

    fn pause(&mut self);

    /// Jump to a position in the loaded media.
    fn seek(&mut self, media_secs: f64);

    /// Position the surface is currently presenting.
    fn position(&self) -> f64;

    /// Opacity for video surfaces, volume for audio surfaces.
    fn set_level(&mut self, _level: f64) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Which track wins when several tracks of one kind have a clip at the
/// playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityRule {
    /// The track with the highest order index (drawn on top).
    HighestOrder,
    /// The first track in order.
    FirstInOrder,
}

impl PriorityRule {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => PriorityRule::HighestOrder,
            MediaKind::Audio => PriorityRule::FirstInOrder,
        }
    }
}

/// The clip a surface should present at the current time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveClip {
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub asset_id: AssetId,
    pub kind: MediaKind,
    pub source: SourceHandle,
    /// Position inside the asset, wrapped for looping clips.
    pub media_secs: f64,
    /// Level after muting is applied.
    pub level: f64,
}

/// Active clips per kind at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub time_secs: f64,
    pub video: Option<ActiveClip>,
    pub audio: Option<ActiveClip>,
}

impl Resolution {
    pub fn get(&self, kind: MediaKind) -> Option<&ActiveClip> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
        }
    }
}

/// Find the active clip of `kind` at `time_secs`.
///
/// Clips whose asset is missing or still processing are skipped.
pub fn resolve_active(project: &Project, kind: MediaKind, time_secs: f64) -> Option<ActiveClip> {
    let tracks = project.tracks().iter().filter(|t| t.kind == kind);
    let ordered: Vec<_> = match PriorityRule::for_kind(kind) {
        PriorityRule::FirstInOrder => tracks.collect(),
        PriorityRule::HighestOrder => tracks.rev().collect(),
    };

    for track in ordered {
        for clip in track.clips.iter().rev() {
            if !clip.contains(time_secs) {
                continue;
            }
            let Some(asset) = project.asset(clip.asset_id).filter(|a| a.is_ready()) else {
                continue;
            };
            return Some(ActiveClip {
                clip_id: clip.id,
                track_id: track.id,
                asset_id: asset.id,
                kind,
                source: asset.source.clone(),
                media_secs: asset.wrap_media_time(clip.media_time_at(time_secs)),
                level: if clip.muted { 0.0 } else { clip.level },
            });
        }
    }
    None
}

/// Active clips of both kinds at `time_secs`.
pub fn resolve(project: &Project, time_secs: f64) -> Resolution {
    Resolution {
        time_secs,
        video: resolve_active(project, MediaKind::Video, time_secs),
        audio: resolve_active(project, MediaKind::Audio, time_secs),
    }
}

struct SurfaceSlot {
    kind: MediaKind,
    surface: Box<dyn PreviewSurface>,
    current: Option<ClipId>,
    level: Option<f64>,
}

/// Drives preview surfaces from the project's playhead.
pub struct PlaybackSynchronizer {
    state: PlaybackState,
    drift_tolerance_secs: f64,
    slots: Vec<SurfaceSlot>,
    last: Resolution,
    drift_corrections: u64,
}

impl PlaybackSynchronizer {
    pub fn new(drift_tolerance_secs: f64) -> Self {
        Self {
            state: PlaybackState::Stopped,
            drift_tolerance_secs,
            slots: Vec::new(),
            last: Resolution::default(),
            drift_corrections: 0,
        }
    }

    /// Attach a surface that presents clips of `kind`.
    pub fn attach_surface(&mut self, kind: MediaKind, surface: Box<dyn PreviewSurface>) {
        self.slots.push(SurfaceSlot {
            kind,
            surface,
            current: None,
            level: None,
        });
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Resolution from the most recent tick, seek or refresh.
    pub fn last_resolution(&self) -> &Resolution {
        &self.last
    }

    /// Number of force-seeks issued because a surface drifted.
    pub fn drift_corrections(&self) -> u64 {
        self.drift_corrections
    }

    /// Start advancing the playhead. Playing from the very end restarts at zero.
    pub fn play(&mut self, project: &mut Project) -> Resolution {
        if project.total_duration_secs > 0.0
            && project.current_time_secs >= project.total_duration_secs
        {
            project.set_current_time(0.0);
        }
        self.state = PlaybackState::Playing;
        tracing::debug!(time = project.current_time_secs, "Playback started");
        let resolution = self.sync(project, true);
        for slot in self.slots.iter_mut().filter(|s| s.current.is_some()) {
            slot.surface.play();
        }
        resolution
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            self.pause_surfaces();
            tracing::debug!(time = self.last.time_secs, "Playback paused");
        }
    }

    /// Halt playback and rewind to zero.
    pub fn stop(&mut self, project: &mut Project) -> Resolution {
        self.state = PlaybackState::Stopped;
        self.pause_surfaces();
        project.set_current_time(0.0);
        tracing::debug!("Playback stopped");
        self.sync(project, true)
    }

    /// Move the playhead, clamped to `[0, total_duration]`, and resolve
    /// immediately.
    pub fn seek(&mut self, project: &mut Project, time_secs: f64) -> Resolution {
        let upper = project.total_duration_secs.max(0.0);
        let time = if time_secs.is_finite() {
            time_secs.clamp(0.0, upper)
        } else {
            0.0
        };
        project.set_current_time(time);
        tracing::trace!(time, "Seek");
        self.sync(project, true)
    }

    /// Advance by `elapsed_secs` of wall time while playing, then resolve.
    ///
    /// Reaching the end of the ruler pauses playback at the end.
    pub fn tick(&mut self, project: &mut Project, elapsed_secs: f64) -> Resolution {
        if self.state == PlaybackState::Playing && elapsed_secs > 0.0 {
            let next = project.current_time_secs + elapsed_secs;
            if next >= project.total_duration_secs {
                project.set_current_time(project.total_duration_secs);
                self.state = PlaybackState::Paused;
                self.pause_surfaces();
                tracing::debug!(time = project.current_time_secs, "Reached end, pausing");
            } else {
                project.set_current_time(next);
            }
        }
        self.sync(project, false)
    }

    /// Re-resolve at the current time after an edit, without forcing seeks.
    pub fn refresh(&mut self, project: &Project) -> Resolution {
        self.sync(project, false)
    }

    /// Push a level straight to the surface showing `clip_id`.
    pub fn preview_level(&mut self, clip_id: ClipId, level: f64) {
        for slot in self.slots.iter_mut().filter(|s| s.current == Some(clip_id)) {
            slot.surface.set_level(level);
            slot.level = Some(level);
        }
    }

    fn pause_surfaces(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.current.is_some()) {
            slot.surface.pause();
        }
    }

    fn sync(&mut self, project: &Project, force_seek: bool) -> Resolution {
        let resolution = resolve(project, project.current_time_secs);
        let playing = self.is_playing();

        for slot in &mut self.slots {
            let active = resolution.get(slot.kind);
            let active_id = active.map(|a| a.clip_id);

            if active_id != slot.current {
                slot.surface.set_source(active);
                slot.current = active_id;
                slot.level = None;
                if let Some(active) = active {
                    tracing::debug!(kind = %slot.kind, clip = %active.clip_id, "Preview source switched");
                    slot.surface.seek(active.media_secs);
                    if playing {
                        slot.surface.play();
                    } else {
                        slot.surface.pause();
                    }
                }
            } else if let Some(active) = active {
                if force_seek {
                    slot.surface.seek(active.media_secs);
                } else {
                    let drift = DriftMeasurement {
                        expected_secs: active.media_secs,
                        reported_secs: slot.surface.position(),
                    };
                    if drift.exceeds(self.drift_tolerance_secs) {
                        tracing::debug!(
                            kind = %slot.kind,
                            drift_ms = drift.drift_ms(),
                            "Preview drifted, resyncing"
                        );
                        slot.surface.seek(active.media_secs);
                        self.drift_corrections += 1;
                    }
                }
            }

            if let Some(active) = active {
                if slot.level != Some(active.level) {
                    slot.surface.set_level(active.level);
                    slot.level = Some(active.level);
                }
            }
        }

        self.last = resolution.clone();
        resolution
    }
}

impl std::fmt::Debug for PlaybackSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSynchronizer")
            .field("state", &self.state)
            .field("drift_tolerance_secs", &self.drift_tolerance_secs)
            .field("surfaces", &self.slots.len())
            .field("last", &self.last)
            .finish()
    }
}
