//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where the project store keeps its projects.
    pub projects_dir: PathBuf,

    /// Timeline editing defaults.
    #[serde(default)]
    pub editor: EditorDefaults,

    /// Preview playback parameters.
    #[serde(default)]
    pub playback: PlaybackDefaults,

    /// Asset import parameters.
    #[serde(default)]
    pub import: ImportDefaults,

    /// Export parameters.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timeline editing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// Initial zoom in pixels per second of timeline.
    pub pixels_per_second: f64,

    /// Narrowest a clip may be resized to, in on-screen pixels.
    pub min_clip_pixel_width: f64,

    /// Height of a single track row in pixels.
    pub track_height_px: f64,

    /// Height of the time ruler above the first track.
    pub ruler_height_px: f64,

    /// Ruler length for new projects, in seconds.
    pub default_total_duration_secs: f64,

    /// Maximum number of undo steps kept.
    pub history_depth: usize,
}

/// Preview playback parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Maximum divergence between a preview surface and the playhead
    /// before the surface is force-seeked.
    pub drift_tolerance_secs: f64,

    /// Tick rate of the preview loop.
    pub preview_fps: u32,
}

/// Asset import parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportDefaults {
    /// Duration assigned to still images.
    pub default_still_duration_secs: f64,

    /// Placeholder duration used while a probe is running.
    pub fallback_duration_secs: f64,

    /// Binary used to probe media durations.
    pub ffprobe_binary: String,
}

/// Export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output format identifier (`mp4-h264`, `mp4-h265`, `webm`).
    pub format: String,

    /// Binary used for transcoding.
    pub ffmpeg_binary: String,

    /// Scratch directory for intermediate media.
    pub work_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            editor: EditorDefaults::default(),
            playback: PlaybackDefaults::default(),
            import: ImportDefaults::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            pixels_per_second: 100.0,
            min_clip_pixel_width: 8.0,
            track_height_px: 48.0,
            ruler_height_px: 24.0,
            default_total_duration_secs: 60.0,
            history_depth: 100,
        }
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            drift_tolerance_secs: 0.25,
            preview_fps: 30,
        }
    }
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            default_still_duration_secs: 5.0,
            fallback_duration_secs: 5.0,
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            format: "mp4-h264".to_string(),
            ffmpeg_binary: "ffmpeg".to_string(),
            work_dir: std::env::temp_dir().join("montage-export"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("montage").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("montage").join("projects")
}
