//! Montage Asset Importer
//!
//! Turns raw media files into project assets without blocking the model.
//! An import registers a `processing` placeholder immediately, then a probe
//! task resolves the true duration in the background. Completions travel
//! back over a channel and are applied by the host with
//! [`AssetImporter::poll_completions`], so the project itself is only ever
//! touched from the host's own task and needs no locking.
//!
//! - **Video / audio:** probed with a [`MetadataProbe`] (ffprobe by default)
//! - **Image:** imported as a video still with a fixed duration, no probe

pub mod probe;
pub mod queue;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use montage_common::config::ImportDefaults;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{AssetId, MediaKind, Project, ReadyState, SourceHandle};
use tokio::sync::mpsc;

pub use probe::{FfprobeProbe, MetadataProbe};
pub use queue::{ImportEntry, ImportQueue, ImportStatus};

/// Media kind declared by whoever hands a file to the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    Video,
    Audio,
    Image,
}

impl DeclaredKind {
    /// The kind of track the resulting asset can be placed on.
    pub fn media_kind(self) -> MediaKind {
        match self {
            DeclaredKind::Video | DeclaredKind::Image => MediaKind::Video,
            DeclaredKind::Audio => MediaKind::Audio,
        }
    }

    /// Guess a kind from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "mkv" | "webm" | "mov" | "avi" => Some(DeclaredKind::Video),
            "wav" | "mp3" | "ogg" | "flac" | "m4a" | "aac" | "opus" => Some(DeclaredKind::Audio),
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" => Some(DeclaredKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclaredKind::Video => "video",
            DeclaredKind::Audio => "audio",
            DeclaredKind::Image => "image",
        })
    }
}

impl FromStr for DeclaredKind {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(DeclaredKind::Video),
            "audio" => Ok(DeclaredKind::Audio),
            "image" => Ok(DeclaredKind::Image),
            other => Err(MontageError::unsupported(format!(
                "unknown media kind '{other}' (expected video, audio or image)"
            ))),
        }
    }
}

/// A file handed to the importer.
#[derive(Debug, Clone)]
pub struct ImportSource {
    pub name: String,
    pub handle: SourceHandle,
    pub declared_kind: DeclaredKind,
}

impl ImportSource {
    pub fn new(name: impl Into<String>, handle: SourceHandle, declared_kind: DeclaredKind) -> Self {
        Self {
            name: name.into(),
            handle,
            declared_kind,
        }
    }

    /// Build a source for a file on disk. The kind is taken from `declared`
    /// when given, otherwise guessed from the extension.
    pub fn from_path(path: &Path, declared: Option<&str>) -> MontageResult<Self> {
        if !path.exists() {
            return Err(MontageError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let declared_kind = match declared {
            Some(kind) => kind.parse()?,
            None => DeclaredKind::from_extension(path).ok_or_else(|| {
                MontageError::unsupported(format!(
                    "cannot infer media kind of {}",
                    path.display()
                ))
            })?,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(
            name,
            SourceHandle::new(path.to_string_lossy()),
            declared_kind,
        ))
    }
}

/// Result of one background probe.
#[derive(Debug)]
pub struct ImportCompletion {
    pub asset_id: AssetId,
    pub result: MontageResult<f64>,
}

/// Runs imports and feeds their results back into a project.
pub struct AssetImporter {
    probe: Arc<dyn MetadataProbe>,
    config: ImportDefaults,
    tx: mpsc::UnboundedSender<ImportCompletion>,
    rx: mpsc::UnboundedReceiver<ImportCompletion>,
    queue: ImportQueue,
}

impl AssetImporter {
    pub fn new(probe: Arc<dyn MetadataProbe>, config: ImportDefaults) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            probe,
            config,
            tx,
            rx,
            queue: ImportQueue::new(),
        }
    }

    /// Importer probing with the configured ffprobe binary.
    pub fn with_ffprobe(config: ImportDefaults) -> Self {
        let probe = Arc::new(FfprobeProbe::new(config.ffprobe_binary.clone()));
        Self::new(probe, config)
    }

    /// Status of every import started so far.
    pub fn queue(&self) -> &ImportQueue {
        &self.queue
    }

    /// Register `source` as a processing asset and start resolving it.
    ///
    /// Returns as soon as the placeholder exists. Video and audio probes run
    /// on the current tokio runtime; stills resolve on the next poll.
    pub fn import_asset(
        &mut self,
        project: &mut Project,
        source: ImportSource,
    ) -> MontageResult<AssetId> {
        let kind = source.declared_kind.media_kind();
        let placeholder = match source.declared_kind {
            DeclaredKind::Image => self.config.default_still_duration_secs,
            DeclaredKind::Video | DeclaredKind::Audio => self.config.fallback_duration_secs,
        };

        let runtime = match source.declared_kind {
            DeclaredKind::Image => None,
            DeclaredKind::Video | DeclaredKind::Audio => {
                Some(tokio::runtime::Handle::try_current().map_err(|e| {
                    MontageError::import(format!("no async runtime for probing: {e}"))
                })?)
            }
        };

        let asset_id = project.add_asset(
            source.name.clone(),
            kind,
            source.handle.clone(),
            placeholder,
            ReadyState::Processing,
        )?;
        self.queue.push(asset_id, source.name.clone());

        tracing::info!(
            asset = %asset_id,
            name = %source.name,
            kind = %source.declared_kind,
            "Import started"
        );

        let tx = self.tx.clone();
        match runtime {
            None => {
                let _ = tx.send(ImportCompletion {
                    asset_id,
                    result: Ok(placeholder),
                });
            }
            Some(runtime) => {
                let probe = Arc::clone(&self.probe);
                let handle = source.handle;
                runtime.spawn(async move {
                    let result = probe.probe_duration(&handle).await;
                    // Fails only if the importer was dropped.
                    let _ = tx.send(ImportCompletion { asset_id, result });
                });
            }
        }

        Ok(asset_id)
    }

    /// Apply every completion that has arrived so far without waiting.
    ///
    /// Returns the number of completions applied.
    pub fn poll_completions(&mut self, project: &mut Project) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply_completion(project, completion);
            applied += 1;
        }
        applied
    }

    /// Wait until no import is pending, applying completions as they arrive.
    pub async fn wait_idle(&mut self, project: &mut Project) {
        while self.queue.pending_count() > 0 {
            match self.rx.recv().await {
                Some(completion) => self.apply_completion(project, completion),
                None => break,
            }
        }
    }

    fn apply_completion(&mut self, project: &mut Project, completion: ImportCompletion) {
        let ImportCompletion { asset_id, result } = completion;
        let status = match result.and_then(|secs| {
            project
                .resolve_asset(asset_id, secs)
                .map(|_| secs)
                .map_err(MontageError::from)
        }) {
            Ok(duration_secs) => {
                tracing::info!(asset = %asset_id, duration_secs, "Import resolved");
                ImportStatus::Resolved { duration_secs }
            }
            Err(e) => {
                tracing::warn!(
                    asset = %asset_id,
                    error = %e,
                    "Import failed, asset stays processing"
                );
                ImportStatus::Failed {
                    message: e.to_string(),
                }
            }
        };
        self.queue.set_status(asset_id, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_kind_parsing() {
        assert_eq!("Video".parse::<DeclaredKind>().unwrap(), DeclaredKind::Video);
        assert_eq!("image".parse::<DeclaredKind>().unwrap().media_kind(), MediaKind::Video);
        assert_eq!(" audio ".parse::<DeclaredKind>().unwrap(), DeclaredKind::Audio);
        assert!(matches!(
            "subtitle".parse::<DeclaredKind>(),
            Err(MontageError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            DeclaredKind::from_extension(Path::new("take1.WEBM")),
            Some(DeclaredKind::Video)
        );
        assert_eq!(
            DeclaredKind::from_extension(Path::new("voice.flac")),
            Some(DeclaredKind::Audio)
        );
        assert_eq!(DeclaredKind::from_extension(Path::new("notes.txt")), None);
        assert_eq!(DeclaredKind::from_extension(Path::new("README")), None);
    }

    #[test]
    fn test_from_path_requires_existing_file() {
        let err = ImportSource::from_path(Path::new("/nonexistent/montage/clip.mp4"), None)
            .unwrap_err();
        assert!(matches!(err, MontageError::FileNotFound { .. }));
    }
}
