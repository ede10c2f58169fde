//! Timeline flattening.
//!
//! Converts the arrangement on the video tracks into an ordered list of
//! media units, the shape the transcoding service consumes. Flattening is a
//! one-shot read of the project; the caller must not edit while it runs.

use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{AssetId, ClipId, MediaKind, Project, SourceHandle, TrackId};
use serde::Serialize;

/// One clip resolved against its asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaUnit {
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub asset_id: AssetId,
    pub source: SourceHandle,

    /// Timeline position of the clip.
    pub start_secs: f64,
    pub duration_secs: f64,
    pub source_offset_secs: f64,

    /// Natural length of the asset.
    pub base_duration_secs: f64,

    /// Repetitions of the asset needed to fill the clip.
    pub loop_count: u32,

    pub level: f64,

    /// `level < 1`: an opacity pass runs before concatenation.
    pub needs_fade_pass: bool,
}

/// A contiguous range read from the source, in asset time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceSegment {
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl MediaUnit {
    /// Source ranges that, played back to back, produce this unit.
    ///
    /// A clip that runs past the end of its asset wraps around to the
    /// start, once per extra repetition.
    pub fn segments(&self) -> Vec<SourceSegment> {
        let base = self.base_duration_secs;
        let mut segments = vec![];
        let mut remaining = self.duration_secs;
        let mut cursor = if self.source_offset_secs >= base {
            self.source_offset_secs.rem_euclid(base)
        } else {
            self.source_offset_secs
        };

        while remaining > SEGMENT_EPSILON_SECS {
            let available = base - cursor;
            let take = remaining.min(available);
            segments.push(SourceSegment {
                start_secs: cursor,
                duration_secs: take,
            });
            remaining -= take;
            cursor = 0.0;
        }
        segments
    }
}

/// Slivers shorter than this are dropped from the segment list.
const SEGMENT_EPSILON_SECS: f64 = 1e-6;

/// The flattened timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    /// Units in playback order.
    pub units: Vec<MediaUnit>,
}

impl RenderPlan {
    /// Length of the concatenated output.
    pub fn total_duration_secs(&self) -> f64 {
        self.units.iter().map(|u| u.duration_secs).sum()
    }

    /// Number of units that need an opacity pass.
    pub fn fade_passes(&self) -> usize {
        self.units.iter().filter(|u| u.needs_fade_pass).count()
    }
}

/// Flatten every clip on the project's video tracks.
///
/// Units are ordered by start time; clips starting together keep track
/// order, then insertion order. Fails with
/// [`MontageError::EmptyTimeline`] when there is nothing to render and with
/// [`MontageError::UnresolvedAsset`] when a clip's asset is not ready.
pub fn flatten(project: &Project) -> MontageResult<RenderPlan> {
    let mut units = vec![];

    for track in project.tracks().iter().filter(|t| t.kind == MediaKind::Video) {
        for clip in &track.clips {
            let asset = project
                .asset(clip.asset_id)
                .ok_or_else(|| MontageError::UnresolvedAsset {
                    asset_id: clip.asset_id.0,
                    name: "<missing>".to_string(),
                })?;
            if !asset.is_ready() {
                return Err(MontageError::UnresolvedAsset {
                    asset_id: asset.id.0,
                    name: asset.name.clone(),
                });
            }

            units.push(MediaUnit {
                clip_id: clip.id,
                track_id: track.id,
                asset_id: asset.id,
                source: asset.source.clone(),
                start_secs: clip.start_secs,
                duration_secs: clip.duration_secs,
                source_offset_secs: clip.source_offset_secs,
                base_duration_secs: asset.base_duration_secs,
                loop_count: asset.loop_count(clip.duration_secs),
                level: clip.level,
                needs_fade_pass: clip.level < 1.0,
            });
        }
    }

    if units.is_empty() {
        return Err(MontageError::EmptyTimeline);
    }

    // Stable: ties keep the track-then-insertion order collected above.
    units.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));

    tracing::debug!(units = units.len(), "Timeline flattened");
    Ok(RenderPlan { units })
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_project_model::ReadyState;

    fn project_with_asset(base: f64, state: ReadyState) -> (Project, TrackId, AssetId) {
        let mut project = Project::new("flatten");
        let track = project.add_track(MediaKind::Video);
        let asset = project
            .add_asset("a.mp4", MediaKind::Video, SourceHandle::new("a.mp4"), base, state)
            .unwrap();
        (project, track, asset)
    }

    #[test]
    fn test_two_adjacent_clips_flatten_in_order() {
        let (mut project, track, asset) = project_with_asset(10.0, ReadyState::Ready);
        let second = project.add_clip(track, asset, 5.0, None).unwrap();
        project.resize_clip(second, 3.0).unwrap();
        let first = project.add_clip(track, asset, 0.0, None).unwrap();
        project.resize_clip(first, 5.0).unwrap();

        let plan = flatten(&project).unwrap();
        let order: Vec<_> = plan.units.iter().map(|u| u.clip_id).collect();
        assert_eq!(order, vec![first, second]);
        assert_eq!(plan.total_duration_secs(), 8.0);
    }

    #[test]
    fn test_empty_timeline_is_an_error() {
        let (mut project, _, _) = project_with_asset(10.0, ReadyState::Ready);
        assert!(matches!(flatten(&project), Err(MontageError::EmptyTimeline)));

        // Audio clips are not eligible.
        let audio = project.add_track(MediaKind::Audio);
        let wav = project
            .add_asset("a.wav", MediaKind::Audio, SourceHandle::new("a.wav"), 3.0, ReadyState::Ready)
            .unwrap();
        project.add_clip(audio, wav, 0.0, None).unwrap();
        assert!(matches!(flatten(&project), Err(MontageError::EmptyTimeline)));
    }

    #[test]
    fn test_processing_asset_is_unresolved() {
        let (mut project, track, asset) = project_with_asset(5.0, ReadyState::Processing);
        project.add_clip(track, asset, 0.0, None).unwrap();
        let err = flatten(&project).unwrap_err();
        assert!(matches!(
            err,
            MontageError::UnresolvedAsset { asset_id, .. } if asset_id == asset.0
        ));
    }

    #[test]
    fn test_loop_count_and_segments() {
        let (mut project, track, asset) = project_with_asset(2.0, ReadyState::Ready);
        let clip = project.add_clip(track, asset, 0.0, None).unwrap();
        project.resize_clip(clip, 5.0).unwrap();

        let plan = flatten(&project).unwrap();
        let unit = &plan.units[0];
        assert_eq!(unit.loop_count, 3);
        assert_eq!(
            unit.segments(),
            vec![
                SourceSegment { start_secs: 0.0, duration_secs: 2.0 },
                SourceSegment { start_secs: 0.0, duration_secs: 2.0 },
                SourceSegment { start_secs: 0.0, duration_secs: 1.0 },
            ]
        );
    }

    #[test]
    fn test_segments_start_at_source_offset() {
        let (mut project, track, asset) = project_with_asset(4.0, ReadyState::Ready);
        let clip = project.add_clip(track, asset, 0.0, None).unwrap();
        let tail = project.split_clip(clip, 3.0).unwrap();
        project.resize_clip(tail, 2.0).unwrap();

        let plan = flatten(&project).unwrap();
        let unit = plan.units.iter().find(|u| u.clip_id == tail).unwrap();
        assert_eq!(
            unit.segments(),
            vec![
                SourceSegment { start_secs: 3.0, duration_secs: 1.0 },
                SourceSegment { start_secs: 0.0, duration_secs: 1.0 },
            ]
        );
    }

    #[test]
    fn test_ties_follow_track_order_and_fade_flag() {
        let mut project = Project::new("ties");
        let lower = project.add_track(MediaKind::Video);
        let upper = project.add_track(MediaKind::Video);
        let asset = project
            .add_asset("a.mp4", MediaKind::Video, SourceHandle::new("a.mp4"), 2.0, ReadyState::Ready)
            .unwrap();
        let on_upper = project.add_clip(upper, asset, 1.0, None).unwrap();
        let on_lower = project.add_clip(lower, asset, 1.0, None).unwrap();
        project.set_clip_level(on_upper, 0.5).unwrap();

        let plan = flatten(&project).unwrap();
        let order: Vec<_> = plan.units.iter().map(|u| u.clip_id).collect();
        assert_eq!(order, vec![on_lower, on_upper]);
        assert!(plan.units[1].needs_fade_pass);
        assert!(!plan.units[0].needs_fade_pass);
        assert_eq!(plan.fade_passes(), 1);
    }
}
