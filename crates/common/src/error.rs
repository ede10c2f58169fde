//! Error types shared across Montage crates.

use std::path::PathBuf;

/// Top-level error type for Montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    /// A clip references an asset that is still processing (or no longer exists).
    #[error("Asset {asset_id} ({name}) is not ready for rendering")]
    UnresolvedAsset { asset_id: u64, name: String },

    #[error("Timeline has no clips eligible for rendering")]
    EmptyTimeline,

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Import error: {message}")]
    Import { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

impl MontageError {
    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the error aborted a render before any output was produced.
    pub fn is_render_precondition(&self) -> bool {
        matches!(self, Self::UnresolvedAsset { .. } | Self::EmptyTimeline)
    }
}
