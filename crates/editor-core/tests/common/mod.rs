#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use montage_common::config::AppConfig;
use montage_editor_core::{ActiveClip, Editor, PreviewSurface};
use montage_project_model::{AssetId, ClipId, MediaKind, Project, ReadyState, SourceHandle, TrackId};

/// Surface that records what it was told to do.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub sources: Arc<Mutex<Vec<Option<ClipId>>>>,
    pub levels: Arc<Mutex<Vec<f64>>>,
    pub position: Arc<Mutex<f64>>,
    pub playing: Arc<Mutex<bool>>,
}

impl RecordingSurface {
    pub fn sources(&self) -> Vec<Option<ClipId>> {
        self.sources.lock().unwrap().clone()
    }

    pub fn last_level(&self) -> Option<f64> {
        self.levels.lock().unwrap().last().copied()
    }
}

impl PreviewSurface for RecordingSurface {
    fn set_source(&mut self, clip: Option<&ActiveClip>) {
        self.sources.lock().unwrap().push(clip.map(|c| c.clip_id));
    }

    fn play(&mut self) {
        *self.playing.lock().unwrap() = true;
    }

    fn pause(&mut self) {
        *self.playing.lock().unwrap() = false;
    }

    fn seek(&mut self, media_secs: f64) {
        *self.position.lock().unwrap() = media_secs;
    }

    fn position(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn set_level(&mut self, level: f64) {
        self.levels.lock().unwrap().push(level);
    }
}

pub struct Timeline {
    pub project: Project,
    pub video: TrackId,
    pub audio: TrackId,
    pub video_asset: AssetId,
    pub audio_asset: AssetId,
}

/// One video and one audio track with a 4 s asset of each kind.
pub fn timeline() -> Timeline {
    let mut project = Project::new("editor");
    project.set_total_duration(30.0).unwrap();
    let video = project.add_track(MediaKind::Video);
    let audio = project.add_track(MediaKind::Audio);
    let video_asset = project
        .add_asset(
            "take.mp4",
            MediaKind::Video,
            SourceHandle::new("take.mp4"),
            4.0,
            ReadyState::Ready,
        )
        .unwrap();
    let audio_asset = project
        .add_asset(
            "take.wav",
            MediaKind::Audio,
            SourceHandle::new("take.wav"),
            4.0,
            ReadyState::Ready,
        )
        .unwrap();
    Timeline {
        project,
        video,
        audio,
        video_asset,
        audio_asset,
    }
}

/// Config with round geometry: 100 px/s, 20 px ruler, 50 px tracks.
pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.editor.pixels_per_second = 100.0;
    config.editor.ruler_height_px = 20.0;
    config.editor.track_height_px = 50.0;
    config.editor.min_clip_pixel_width = 10.0;
    config
}

pub fn editor(project: Project) -> Editor {
    Editor::new(project, &config())
}
