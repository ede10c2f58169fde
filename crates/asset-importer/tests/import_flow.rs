use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use montage_asset_importer::{
    AssetImporter, DeclaredKind, ImportSource, ImportStatus, MetadataProbe,
};
use montage_common::config::ImportDefaults;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{MediaKind, Project, ReadyState, SourceHandle};

/// Probe answering from a fixed table after a short delay.
struct TableProbe {
    durations: HashMap<String, f64>,
    delay: Duration,
    calls: AtomicUsize,
}

impl TableProbe {
    fn new(entries: &[(&str, f64)]) -> Self {
        Self {
            durations: entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            delay: Duration::from_millis(5),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MetadataProbe for TableProbe {
    async fn probe_duration(&self, source: &SourceHandle) -> MontageResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.durations
            .get(source.as_str())
            .copied()
            .ok_or_else(|| MontageError::import(format!("cannot decode {source}")))
    }

    fn name(&self) -> &str {
        "table"
    }
}

fn source(name: &str, kind: DeclaredKind) -> ImportSource {
    ImportSource::new(name, SourceHandle::new(name), kind)
}

#[tokio::test]
async fn import_returns_placeholder_then_resolves() {
    let probe = Arc::new(TableProbe::new(&[("talk.mp4", 42.5)]));
    let mut importer = AssetImporter::new(probe, ImportDefaults::default());
    let mut project = Project::new("import");

    let id = importer
        .import_asset(&mut project, source("talk.mp4", DeclaredKind::Video))
        .unwrap();

    let placeholder = project.asset(id).unwrap();
    assert_eq!(placeholder.ready_state, ReadyState::Processing);
    assert!((placeholder.base_duration_secs - 5.0).abs() < 1e-9);
    assert_eq!(importer.queue().status(id), Some(&ImportStatus::Pending));

    importer.wait_idle(&mut project).await;

    let asset = project.asset(id).unwrap();
    assert!(asset.is_ready());
    assert!((asset.base_duration_secs - 42.5).abs() < 1e-9);
    assert_eq!(
        importer.queue().status(id),
        Some(&ImportStatus::Resolved {
            duration_secs: 42.5
        })
    );
}

#[tokio::test]
async fn failed_probe_leaves_asset_processing_and_spares_others() {
    let probe = Arc::new(TableProbe::new(&[("voice.wav", 8.0)]));
    let mut importer = AssetImporter::new(probe, ImportDefaults::default());
    let mut project = Project::new("import");

    let broken = importer
        .import_asset(&mut project, source("broken.mp4", DeclaredKind::Video))
        .unwrap();
    let voice = importer
        .import_asset(&mut project, source("voice.wav", DeclaredKind::Audio))
        .unwrap();

    importer.wait_idle(&mut project).await;

    assert_eq!(
        project.asset(broken).unwrap().ready_state,
        ReadyState::Processing
    );
    assert!(matches!(
        importer.queue().status(broken),
        Some(ImportStatus::Failed { .. })
    ));
    let voice = project.asset(voice).unwrap();
    assert!(voice.is_ready());
    assert_eq!(voice.media_type, MediaKind::Audio);
    assert_eq!(importer.queue().failed_count(), 1);
}

#[tokio::test]
async fn model_stays_editable_while_imports_run() {
    let probe = Arc::new(TableProbe::new(&[("screen.webm", 12.0)]));
    let mut importer = AssetImporter::new(probe, ImportDefaults::default());
    let mut project = Project::new("import");
    let track = project.add_track(MediaKind::Video);

    let id = importer
        .import_asset(&mut project, source("screen.webm", DeclaredKind::Video))
        .unwrap();

    // A placeholder clip may reference the asset before it resolves.
    let clip = project.add_clip(track, id, 1.0, None).unwrap();
    project.resize_clip(clip, 20.0).unwrap();

    importer.wait_idle(&mut project).await;

    let clip = project.clip(clip).unwrap();
    assert!((clip.duration_secs - 20.0).abs() < 1e-9);
    assert!(project.asset(id).unwrap().is_ready());
}

#[tokio::test]
async fn stills_resolve_without_probing() {
    let probe = Arc::new(TableProbe::new(&[]));
    let mut importer = AssetImporter::new(probe.clone(), ImportDefaults::default());
    let mut project = Project::new("import");

    let id = importer
        .import_asset(&mut project, source("title.png", DeclaredKind::Image))
        .unwrap();
    assert_eq!(project.asset(id).unwrap().media_type, MediaKind::Video);
    assert!(!project.asset(id).unwrap().is_ready());

    assert_eq!(importer.poll_completions(&mut project), 1);

    let asset = project.asset(id).unwrap();
    assert!(asset.is_ready());
    assert!((asset.base_duration_secs - 5.0).abs() < 1e-9);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn probing_outside_a_runtime_is_an_import_error() {
    let probe = Arc::new(TableProbe::new(&[]));
    let mut importer = AssetImporter::new(probe, ImportDefaults::default());
    let mut project = Project::new("import");

    let err = importer
        .import_asset(&mut project, source("clip.mp4", DeclaredKind::Video))
        .unwrap_err();

    assert!(matches!(err, MontageError::Import { .. }));
    assert_eq!(project.assets().count(), 0);
}
