//! Pointer gestures on the timeline.
//!
//! The controller is a pure translator: it reads the project and the
//! selection, and turns press/move/release events into [`Intent`]s. It never
//! mutates anything itself; the [`Editor`](crate::Editor) dispatches the
//! intents. One gesture is active at a time and goes
//! `Idle -> Active -> Committed` between a press and its release.
//!
//! Move and level-fade emit model edits on every pointer move so playback
//! preview follows the drag. Resize and track reorder only preview while
//! dragging and emit their edit on release.

use montage_common::config::EditorDefaults;
use montage_project_model::{
    ClipId, ClipMove, EditCommand, MediaKind, Project, TrackId,
};

use crate::selection::Selection;

// ── Pure geometry helpers ───────────────────────────────────────────────

/// New leading edge of a dragged clip. Never negative.
pub fn compute_move_start(original_start: f64, delta_secs: f64) -> f64 {
    (original_start + delta_secs).max(0.0)
}

/// New length of a clip dragged by its trailing edge.
pub fn compute_resize_duration(original: f64, delta_secs: f64, min_duration: f64) -> f64 {
    (original + delta_secs).max(min_duration)
}

/// New level from a vertical drag. Dragging up (negative `delta_y`) raises it.
pub fn compute_fade_level(original: f64, delta_y: f64, element_height: f64) -> f64 {
    if element_height <= 0.0 {
        return original.clamp(0.0, 1.0);
    }
    (original - delta_y / element_height).clamp(0.0, 1.0)
}

/// Maps between pointer coordinates and timeline positions.
///
/// `x` is measured in timeline pixels from time zero (scroll already
/// applied); `y` from the top of the ruler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineGeometry {
    pub pixels_per_second: f64,
    pub track_height_px: f64,
    pub ruler_height_px: f64,
    pub min_clip_pixel_width: f64,
}

impl TimelineGeometry {
    pub fn from_config(config: &EditorDefaults, pixels_per_second: f64) -> Self {
        Self {
            pixels_per_second,
            track_height_px: config.track_height_px,
            ruler_height_px: config.ruler_height_px,
            min_clip_pixel_width: config.min_clip_pixel_width,
        }
    }

    /// Seconds at a horizontal position, possibly negative left of zero.
    pub fn raw_time_at(&self, x: f64) -> f64 {
        x / self.pixels_per_second
    }

    /// Seconds at a horizontal position, clamped to zero.
    pub fn time_at(&self, x: f64) -> f64 {
        self.raw_time_at(x).max(0.0)
    }

    pub fn x_for_time(&self, secs: f64) -> f64 {
        secs * self.pixels_per_second
    }

    /// Index of the track row under a vertical position.
    pub fn track_index_at(&self, y: f64) -> Option<usize> {
        if y < self.ruler_height_px || self.track_height_px <= 0.0 {
            return None;
        }
        Some(((y - self.ruler_height_px) / self.track_height_px).floor() as usize)
    }

    /// Shortest clip a resize may produce at the current zoom.
    pub fn min_clip_duration(&self) -> f64 {
        self.min_clip_pixel_width / self.pixels_per_second
    }
}

/// What the pointer is over, as reported by the host's hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    ClipBody { clip_id: ClipId },
    ClipTrailingEdge { clip_id: ClipId },
    /// The level handle of a clip, with the height of the clip element that
    /// normalizes vertical drags.
    ClipLevelHandle { clip_id: ClipId, element_height_px: f64 },
    TrackHeader { track_id: TrackId },
    /// Empty space on a track row.
    TrackArea { track_id: TrackId },
    Ruler,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub target: HitTarget,
    /// Shift/Ctrl held.
    pub additive: bool,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, target: HitTarget) -> Self {
        Self {
            x,
            y,
            target,
            additive: false,
        }
    }

    pub fn additive(mut self) -> Self {
        self.additive = true;
        self
    }
}

/// Requests produced by the controller, in the order they must be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Edit(EditCommand),
    Seek(f64),
    ClearSelection,
    Select { clip_id: ClipId, additive: bool },
    /// Push a level to the preview surfaces right away.
    PreviewLevel { clip_id: ClipId, level: f64 },
    /// Visual-only resize feedback.
    PreviewResize { clip_id: ClipId, duration_secs: f64 },
    /// Collapse the following edits into one undo step.
    BeginBatch { label: &'static str },
    EndBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Active,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize,
    LevelFade,
    TrackReorder,
    Scrub,
}

#[derive(Debug, Clone, Copy)]
struct DraggedClip {
    clip_id: ClipId,
    start_secs: f64,
    track_id: TrackId,
    kind: MediaKind,
}

#[derive(Debug, Clone)]
enum Gesture {
    Move {
        primary: ClipId,
        origin_secs: f64,
        /// Captured on the first move, once the press's selection applied.
        dragged: Option<Vec<DraggedClip>>,
    },
    Resize {
        clip_id: ClipId,
        origin_secs: f64,
        original_duration: f64,
        preview_duration: f64,
    },
    LevelFade {
        clip_id: ClipId,
        origin_y: f64,
        element_height: f64,
        original_level: f64,
    },
    TrackReorder {
        track_id: TrackId,
        hover: Option<TrackId>,
    },
    Scrub,
}

impl Gesture {
    fn kind(&self) -> GestureKind {
        match self {
            Gesture::Move { .. } => GestureKind::Move,
            Gesture::Resize { .. } => GestureKind::Resize,
            Gesture::LevelFade { .. } => GestureKind::LevelFade,
            Gesture::TrackReorder { .. } => GestureKind::TrackReorder,
            Gesture::Scrub => GestureKind::Scrub,
        }
    }
}

/// Per-pointer gesture state machine.
#[derive(Debug)]
pub struct InteractionController {
    geometry: TimelineGeometry,
    phase: GesturePhase,
    gesture: Option<Gesture>,
}

impl InteractionController {
    pub fn new(geometry: TimelineGeometry) -> Self {
        Self {
            geometry,
            phase: GesturePhase::Idle,
            gesture: None,
        }
    }

    pub fn geometry(&self) -> &TimelineGeometry {
        &self.geometry
    }

    /// Follow a zoom change.
    pub fn set_pixels_per_second(&mut self, pixels_per_second: f64) {
        if pixels_per_second > 0.0 {
            self.geometry.pixels_per_second = pixels_per_second;
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Kind of the gesture in progress, if any.
    pub fn active_gesture(&self) -> Option<GestureKind> {
        match self.phase {
            GesturePhase::Active => self.gesture.as_ref().map(Gesture::kind),
            _ => None,
        }
    }

    pub fn press(
        &mut self,
        project: &Project,
        selection: &Selection,
        event: PointerEvent,
    ) -> Vec<Intent> {
        if self.phase == GesturePhase::Active {
            tracing::debug!("Press ignored: another gesture is active");
            return vec![];
        }

        let time = self.geometry.raw_time_at(event.x);
        let (gesture, intents) = match event.target {
            HitTarget::ClipBody { clip_id } => {
                if project.clip(clip_id).is_none() {
                    return vec![];
                }
                let mut intents = vec![];
                if event.additive || !selection.contains(clip_id) {
                    intents.push(Intent::Select {
                        clip_id,
                        additive: event.additive,
                    });
                }
                intents.push(Intent::BeginBatch {
                    label: "Move clips",
                });
                let gesture = Gesture::Move {
                    primary: clip_id,
                    origin_secs: time,
                    dragged: None,
                };
                (gesture, intents)
            }
            HitTarget::ClipTrailingEdge { clip_id } => {
                let Some(clip) = project.clip(clip_id) else {
                    return vec![];
                };
                let gesture = Gesture::Resize {
                    clip_id,
                    origin_secs: time,
                    original_duration: clip.duration_secs,
                    preview_duration: clip.duration_secs,
                };
                (gesture, vec![])
            }
            HitTarget::ClipLevelHandle {
                clip_id,
                element_height_px,
            } => {
                let Some(clip) = project.clip(clip_id) else {
                    return vec![];
                };
                let gesture = Gesture::LevelFade {
                    clip_id,
                    origin_y: event.y,
                    element_height: element_height_px,
                    original_level: clip.level,
                };
                (gesture, vec![Intent::BeginBatch { label: "Set level" }])
            }
            HitTarget::TrackHeader { track_id } => {
                if project.track(track_id).is_none() {
                    return vec![];
                }
                let gesture = Gesture::TrackReorder {
                    track_id,
                    hover: None,
                };
                (gesture, vec![])
            }
            HitTarget::TrackArea { .. } | HitTarget::Ruler | HitTarget::Empty => (
                Gesture::Scrub,
                vec![Intent::ClearSelection, Intent::Seek(time.max(0.0))],
            ),
        };

        tracing::debug!(gesture = ?gesture.kind(), x = event.x, y = event.y, "Gesture started");
        self.gesture = Some(gesture);
        self.phase = GesturePhase::Active;
        intents
    }

    pub fn pointer_move(
        &mut self,
        project: &Project,
        selection: &Selection,
        event: PointerEvent,
    ) -> Vec<Intent> {
        if self.phase != GesturePhase::Active {
            return vec![];
        }
        let geometry = self.geometry;
        let Some(gesture) = self.gesture.as_mut() else {
            return vec![];
        };

        match gesture {
            Gesture::Move {
                primary,
                origin_secs,
                dragged,
            } => {
                let dragged = dragged.get_or_insert_with(|| capture_dragged(project, selection));
                let delta = geometry.raw_time_at(event.x) - *origin_secs;
                let moves = plan_moves(project, &geometry, *primary, dragged, delta, event.y);
                if moves.is_empty() {
                    vec![]
                } else {
                    vec![Intent::Edit(EditCommand::MoveClips { moves })]
                }
            }
            Gesture::Resize {
                clip_id,
                origin_secs,
                original_duration,
                preview_duration,
            } => {
                let delta = geometry.raw_time_at(event.x) - *origin_secs;
                *preview_duration = compute_resize_duration(
                    *original_duration,
                    delta,
                    geometry.min_clip_duration(),
                );
                vec![Intent::PreviewResize {
                    clip_id: *clip_id,
                    duration_secs: *preview_duration,
                }]
            }
            Gesture::LevelFade {
                clip_id,
                origin_y,
                element_height,
                original_level,
            } => {
                let level =
                    compute_fade_level(*original_level, event.y - *origin_y, *element_height);
                vec![
                    Intent::Edit(EditCommand::SetClipLevel {
                        clip_id: *clip_id,
                        level,
                    }),
                    Intent::PreviewLevel {
                        clip_id: *clip_id,
                        level,
                    },
                ]
            }
            Gesture::TrackReorder { hover, .. } => {
                *hover = match event.target {
                    HitTarget::TrackHeader { track_id } => Some(track_id),
                    _ => None,
                };
                vec![]
            }
            Gesture::Scrub => vec![Intent::Seek(geometry.time_at(event.x))],
        }
    }

    pub fn release(
        &mut self,
        project: &Project,
        selection: &Selection,
        event: PointerEvent,
    ) -> Vec<Intent> {
        if self.phase != GesturePhase::Active {
            return vec![];
        }
        // The release position counts as a final move.
        let mut intents = match self.gesture {
            Some(Gesture::TrackReorder { .. }) | Some(Gesture::Resize { .. }) => vec![],
            _ => self.pointer_move(project, selection, event),
        };

        let Some(gesture) = self.gesture.take() else {
            return intents;
        };
        match gesture {
            Gesture::Move { .. } | Gesture::LevelFade { .. } => intents.push(Intent::EndBatch),
            Gesture::Resize {
                clip_id,
                origin_secs,
                original_duration,
                ..
            } => {
                let delta = self.geometry.raw_time_at(event.x) - origin_secs;
                let duration_secs = compute_resize_duration(
                    original_duration,
                    delta,
                    self.geometry.min_clip_duration(),
                );
                if duration_secs != original_duration {
                    intents.push(Intent::Edit(EditCommand::ResizeClip {
                        clip_id,
                        duration_secs,
                    }));
                }
            }
            Gesture::TrackReorder { track_id, .. } => match event.target {
                HitTarget::TrackHeader { track_id: target }
                    if target != track_id && project.track(target).is_some() =>
                {
                    intents.push(Intent::Edit(EditCommand::SwapTracks {
                        a: track_id,
                        b: target,
                    }));
                }
                _ => tracing::debug!(track = %track_id, "Track drop outside a header, no reorder"),
            },
            Gesture::Scrub => {}
        }

        self.phase = GesturePhase::Committed;
        tracing::debug!(intents = intents.len(), "Gesture committed");
        intents
    }
}

fn capture_dragged(project: &Project, selection: &Selection) -> Vec<DraggedClip> {
    selection
        .entries()
        .iter()
        .filter_map(|entry| {
            let clip = project.clip(entry.clip_id)?;
            let track = project.track(clip.track_id)?;
            Some(DraggedClip {
                clip_id: clip.id,
                start_secs: clip.start_secs,
                track_id: clip.track_id,
                kind: track.kind,
            })
        })
        .collect()
}

/// Moves for every dragged clip at a constant delta.
///
/// When the pointer sits over a track of the primary clip's kind other than
/// the one it started on, every dragged clip of that kind moves onto it.
/// Everything else stays on (or returns to) its original track.
fn plan_moves(
    project: &Project,
    geometry: &TimelineGeometry,
    primary: ClipId,
    dragged: &[DraggedClip],
    delta: f64,
    pointer_y: f64,
) -> Vec<ClipMove> {
    let Some(anchor) = dragged.iter().find(|d| d.clip_id == primary) else {
        return vec![];
    };

    let migrate_to = geometry
        .track_index_at(pointer_y)
        .and_then(|index| project.tracks().get(index))
        .filter(|track| track.kind == anchor.kind && track.id != anchor.track_id)
        .map(|track| track.id);

    dragged
        .iter()
        .map(|d| {
            let track_id = match migrate_to {
                Some(target) if d.kind == anchor.kind => target,
                _ => d.track_id,
            };
            ClipMove::new(
                d.clip_id,
                compute_move_start(d.start_secs, delta),
                Some(track_id),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_project_model::{ReadyState, SourceHandle};

    fn geometry() -> TimelineGeometry {
        TimelineGeometry {
            pixels_per_second: 100.0,
            track_height_px: 50.0,
            ruler_height_px: 20.0,
            min_clip_pixel_width: 10.0,
        }
    }

    #[test]
    fn test_pure_helpers() {
        assert_eq!(compute_move_start(1.0, -3.0), 0.0);
        assert_eq!(compute_move_start(1.0, 0.5), 1.5);
        assert_eq!(compute_resize_duration(2.0, -5.0, 0.1), 0.1);
        assert_eq!(compute_resize_duration(2.0, 1.0, 0.1), 3.0);
        assert_eq!(compute_fade_level(0.5, -25.0, 50.0), 1.0);
        assert_eq!(compute_fade_level(1.0, 25.0, 50.0), 0.5);
        assert_eq!(compute_fade_level(0.2, 100.0, 50.0), 0.0);
    }

    #[test]
    fn test_geometry() {
        let g = geometry();
        assert_eq!(g.track_index_at(10.0), None);
        assert_eq!(g.track_index_at(20.0), Some(0));
        assert_eq!(g.track_index_at(75.0), Some(1));
        assert_eq!(g.time_at(-50.0), 0.0);
        assert_eq!(g.raw_time_at(-50.0), -0.5);
        assert!((g.min_clip_duration() - 0.1).abs() < 1e-12);
    }

    fn project_with_clip() -> (Project, TrackId, ClipId) {
        let mut project = Project::new("gestures");
        let track = project.add_track(MediaKind::Video);
        let asset = project
            .add_asset("a.mp4", MediaKind::Video, SourceHandle::new("a.mp4"), 2.0, ReadyState::Ready)
            .unwrap();
        let clip = project.add_clip(track, asset, 1.0, None).unwrap();
        (project, track, clip)
    }

    #[test]
    fn test_resize_is_preview_until_release() {
        let (project, _, clip) = project_with_clip();
        let selection = Selection::new();
        let mut controller = InteractionController::new(geometry());
        let edge = HitTarget::ClipTrailingEdge { clip_id: clip };

        assert!(controller
            .press(&project, &selection, PointerEvent::new(300.0, 30.0, edge))
            .is_empty());
        let preview = controller.pointer_move(&project, &selection, PointerEvent::new(400.0, 30.0, edge));
        assert_eq!(
            preview,
            vec![Intent::PreviewResize {
                clip_id: clip,
                duration_secs: 3.0
            }]
        );

        let commit = controller.release(&project, &selection, PointerEvent::new(0.0, 30.0, edge));
        assert_eq!(
            commit,
            vec![Intent::Edit(EditCommand::ResizeClip {
                clip_id: clip,
                duration_secs: 0.1
            })]
        );
        assert_eq!(controller.phase(), GesturePhase::Committed);
    }

    #[test]
    fn test_level_fade_is_live() {
        let (project, _, clip) = project_with_clip();
        let selection = Selection::new();
        let mut controller = InteractionController::new(geometry());
        let handle = HitTarget::ClipLevelHandle {
            clip_id: clip,
            element_height_px: 40.0,
        };

        let press = controller.press(&project, &selection, PointerEvent::new(150.0, 30.0, handle));
        assert_eq!(press, vec![Intent::BeginBatch { label: "Set level" }]);

        let live = controller.pointer_move(&project, &selection, PointerEvent::new(150.0, 40.0, handle));
        assert_eq!(
            live,
            vec![
                Intent::Edit(EditCommand::SetClipLevel {
                    clip_id: clip,
                    level: 0.75
                }),
                Intent::PreviewLevel {
                    clip_id: clip,
                    level: 0.75
                },
            ]
        );

        let done = controller.release(&project, &selection, PointerEvent::new(150.0, 40.0, handle));
        assert_eq!(done.last(), Some(&Intent::EndBatch));
    }

    #[test]
    fn test_track_reorder_needs_header_drop() {
        let mut project = Project::new("reorder");
        let a = project.add_track(MediaKind::Video);
        let b = project.add_track(MediaKind::Audio);
        let selection = Selection::new();
        let mut controller = InteractionController::new(geometry());

        controller.press(&project, &selection, PointerEvent::new(0.0, 30.0, HitTarget::TrackHeader { track_id: a }));
        let none = controller.release(&project, &selection, PointerEvent::new(0.0, 200.0, HitTarget::Empty));
        assert!(none.is_empty());

        controller.press(&project, &selection, PointerEvent::new(0.0, 30.0, HitTarget::TrackHeader { track_id: a }));
        let swap = controller.release(
            &project,
            &selection,
            PointerEvent::new(0.0, 80.0, HitTarget::TrackHeader { track_id: b }),
        );
        assert_eq!(swap, vec![Intent::Edit(EditCommand::SwapTracks { a, b })]);
    }

    #[test]
    fn test_scrub_clears_selection_and_seeks() {
        let (project, track, _) = project_with_clip();
        let selection = Selection::new();
        let mut controller = InteractionController::new(geometry());

        let press = controller.press(
            &project,
            &selection,
            PointerEvent::new(250.0, 30.0, HitTarget::TrackArea { track_id: track }),
        );
        assert_eq!(press, vec![Intent::ClearSelection, Intent::Seek(2.5)]);

        let drag = controller.pointer_move(&project, &selection, PointerEvent::new(-40.0, 5.0, HitTarget::Ruler));
        assert_eq!(drag, vec![Intent::Seek(0.0)]);
    }

    #[test]
    fn test_second_press_while_active_is_ignored() {
        let (project, track, _) = project_with_clip();
        let selection = Selection::new();
        let mut controller = InteractionController::new(geometry());
        let area = HitTarget::TrackArea { track_id: track };

        controller.press(&project, &selection, PointerEvent::new(10.0, 30.0, area));
        assert_eq!(controller.active_gesture(), Some(GestureKind::Scrub));
        assert!(controller
            .press(&project, &selection, PointerEvent::new(20.0, 30.0, HitTarget::Ruler))
            .is_empty());
    }

    #[test]
    fn test_move_migrates_only_to_same_kind_track() {
        let mut project = Project::new("migrate");
        let v1 = project.add_track(MediaKind::Video);
        let _audio = project.add_track(MediaKind::Audio);
        let v2 = project.add_track(MediaKind::Video);
        let asset = project
            .add_asset("a.mp4", MediaKind::Video, SourceHandle::new("a.mp4"), 2.0, ReadyState::Ready)
            .unwrap();
        let clip = project.add_clip(v1, asset, 1.0, None).unwrap();
        let mut selection = Selection::new();
        selection.select(&project, clip, false);
        let mut controller = InteractionController::new(geometry());
        let body = HitTarget::ClipBody { clip_id: clip };

        let press = controller.press(&project, &selection, PointerEvent::new(150.0, 30.0, body));
        assert_eq!(press, vec![Intent::BeginBatch { label: "Move clips" }]);

        // Over the audio row: time moves, track does not.
        let over_audio = controller.pointer_move(&project, &selection, PointerEvent::new(250.0, 80.0, body));
        assert_eq!(
            over_audio,
            vec![Intent::Edit(EditCommand::MoveClips {
                moves: vec![ClipMove::new(clip, 2.0, Some(v1))]
            })]
        );

        // Over the second video row: migrates.
        let over_video = controller.pointer_move(&project, &selection, PointerEvent::new(250.0, 130.0, body));
        assert_eq!(
            over_video,
            vec![Intent::Edit(EditCommand::MoveClips {
                moves: vec![ClipMove::new(clip, 2.0, Some(v2))]
            })]
        );
    }
}
