//! Headless preview: runs the playback loop against logging surfaces.

use std::time::Instant;

use montage_common::config::AppConfig;
use montage_editor_core::{ActiveClip, Editor, PreviewSurface};
use montage_project_model::MediaKind;

/// Stands in for a player: keeps its own clock and logs source changes.
struct ClockSurface {
    kind: MediaKind,
    base_secs: f64,
    started: Option<Instant>,
}

impl ClockSurface {
    fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            base_secs: 0.0,
            started: None,
        }
    }

    fn restart_clock(&mut self) {
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

impl PreviewSurface for ClockSurface {
    fn set_source(&mut self, clip: Option<&ActiveClip>) {
        match clip {
            Some(clip) => {
                tracing::info!(
                    kind = %self.kind,
                    clip = %clip.clip_id,
                    source = %clip.source,
                    media_secs = clip.media_secs,
                    level = clip.level,
                    "Source switched"
                );
                self.base_secs = clip.media_secs;
            }
            None => {
                tracing::info!(kind = %self.kind, "Source cleared");
                self.base_secs = 0.0;
            }
        }
        self.restart_clock();
    }

    fn play(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base_secs = self.position();
        self.started = None;
    }

    fn seek(&mut self, media_secs: f64) {
        self.base_secs = media_secs;
        self.restart_clock();
    }

    fn position(&self) -> f64 {
        self.base_secs + self.started.map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    fn set_level(&mut self, level: f64) {
        tracing::debug!(kind = %self.kind, level, "Level changed");
    }
}

pub async fn run(config: &AppConfig, id: &str, from: f64, fps: Option<u32>) -> anyhow::Result<()> {
    let bundle = super::load(config, id)?;
    let mut config = config.clone();
    if let Some(fps) = fps {
        config.playback.preview_fps = fps;
    }

    let mut editor = Editor::new(bundle.project, &config);
    editor.attach_surface(MediaKind::Video, Box::new(ClockSurface::new(MediaKind::Video)));
    editor.attach_surface(MediaKind::Audio, Box::new(ClockSurface::new(MediaKind::Audio)));

    let start = editor.seek(from);
    println!(
        "Previewing '{}' from {:.2}s of {:.2}s (Ctrl-C to stop)",
        editor.project().name,
        start.time_secs,
        editor.project().total_duration_secs
    );

    let finished = tokio::select! {
        ticks = editor.run_playback() => Some(ticks),
        _ = tokio::signal::ctrl_c() => None,
    };
    match finished {
        Some(ticks) => println!("Reached the end after {ticks} frames"),
        None => {
            editor.pause();
            println!("\nStopped at {:.2}s", editor.project().current_time_secs);
        }
    }

    Ok(())
}
