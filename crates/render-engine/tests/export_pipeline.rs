use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{MediaKind, Project, ReadyState, SourceHandle};
use montage_render_engine::{
    export_timeline, ExportJob, ExportStage, MediaHandle, OutputFormat, ProgressCallback,
    TranscodingService,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Trim(String, f64, f64),
    Opacity(String, f64),
    Concat(Vec<String>),
    Deliver(String, PathBuf),
}

/// Records every call and names outputs after their inputs.
#[derive(Default)]
struct FakeService {
    calls: Mutex<Vec<Call>>,
    fail_concat: bool,
    cleanups: Mutex<usize>,
}

impl FakeService {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn cleanups(&self) -> usize {
        *self.cleanups.lock().unwrap()
    }
}

#[async_trait]
impl TranscodingService for FakeService {
    async fn concatenate(
        &self,
        inputs: &[MediaHandle],
        _format: OutputFormat,
    ) -> MontageResult<MediaHandle> {
        let names: Vec<String> = inputs.iter().map(|h| h.to_string()).collect();
        self.calls.lock().unwrap().push(Call::Concat(names));
        if self.fail_concat {
            return Err(MontageError::transcode("concat exploded"));
        }
        Ok(MediaHandle::new("joined"))
    }

    async fn trim(
        &self,
        input: &MediaHandle,
        start_secs: f64,
        duration_secs: f64,
        _format: OutputFormat,
    ) -> MontageResult<MediaHandle> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Trim(input.to_string(), start_secs, duration_secs));
        Ok(MediaHandle::new(format!("{input}@{start_secs}+{duration_secs}")))
    }

    async fn apply_opacity(&self, input: &MediaHandle, level: f64) -> MontageResult<MediaHandle> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Opacity(input.to_string(), level));
        Ok(MediaHandle::new(format!("{input}*{level}")))
    }

    async fn deliver(&self, media: &MediaHandle, destination: &Path) -> MontageResult<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Deliver(media.to_string(), destination.to_path_buf()));
        Ok(destination.to_path_buf())
    }

    async fn cleanup(&self) -> MontageResult<()> {
        *self.cleanups.lock().unwrap() += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn ready_asset(project: &mut Project, name: &str, base: f64) -> montage_project_model::AssetId {
    project
        .add_asset(name, MediaKind::Video, SourceHandle::new(name), base, ReadyState::Ready)
        .unwrap()
}

fn job() -> ExportJob {
    ExportJob::new("out.mp4", OutputFormat::Mp4H264)
}

#[tokio::test]
async fn export_trims_fades_and_concatenates_in_timeline_order() {
    let mut project = Project::new("export");
    let track = project.add_track(MediaKind::Video);
    let a = ready_asset(&mut project, "a.mp4", 5.0);
    let b = ready_asset(&mut project, "b.mp4", 3.0);

    let second = project.add_clip(track, b, 5.0, None).unwrap();
    project.set_clip_level(second, 0.5).unwrap();
    project.add_clip(track, a, 0.0, None).unwrap();

    let service = FakeService::default();
    let delivered = export_timeline(&project, &service, &job(), None).await.unwrap();
    assert_eq!(delivered, PathBuf::from("out.mp4"));

    assert_eq!(
        service.calls(),
        vec![
            Call::Trim("a.mp4".into(), 0.0, 5.0),
            Call::Trim("b.mp4".into(), 0.0, 3.0),
            Call::Opacity("b.mp4@0+3".into(), 0.5),
            Call::Concat(vec!["a.mp4@0+5".into(), "b.mp4@0+3*0.5".into()]),
            Call::Deliver("joined".into(), PathBuf::from("out.mp4")),
        ]
    );
    assert_eq!(service.cleanups(), 1);
}

#[tokio::test]
async fn looping_clip_is_trimmed_once_per_repetition() {
    let mut project = Project::new("loops");
    let track = project.add_track(MediaKind::Video);
    let a = ready_asset(&mut project, "loop.mp4", 2.0);
    let clip = project.add_clip(track, a, 0.0, None).unwrap();
    project.resize_clip(clip, 5.0).unwrap();

    let service = FakeService::default();
    export_timeline(&project, &service, &job(), None).await.unwrap();

    let trims: Vec<_> = service
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Trim(..)))
        .collect();
    assert_eq!(
        trims,
        vec![
            Call::Trim("loop.mp4".into(), 0.0, 2.0),
            Call::Trim("loop.mp4".into(), 0.0, 2.0),
            Call::Trim("loop.mp4".into(), 0.0, 1.0),
        ]
    );
}

#[tokio::test]
async fn unresolved_asset_aborts_before_any_transcoding() {
    let mut project = Project::new("pending");
    let track = project.add_track(MediaKind::Video);
    let pending = project
        .add_asset(
            "slow.mp4",
            MediaKind::Video,
            SourceHandle::new("slow.mp4"),
            5.0,
            ReadyState::Processing,
        )
        .unwrap();
    project.add_clip(track, pending, 0.0, None).unwrap();

    let service = FakeService::default();
    let err = export_timeline(&project, &service, &job(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, MontageError::UnresolvedAsset { .. }));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn transcode_failure_delivers_nothing_and_reports_failed() {
    let mut project = Project::new("broken");
    let track = project.add_track(MediaKind::Video);
    let a = ready_asset(&mut project, "a.mp4", 1.0);
    project.add_clip(track, a, 0.0, None).unwrap();

    let stages = Arc::new(Mutex::new(vec![]));
    let sink = stages.clone();
    let progress: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p.stage));

    let service = FakeService {
        fail_concat: true,
        ..FakeService::default()
    };
    let err = export_timeline(&project, &service, &job(), Some(progress))
        .await
        .unwrap_err();
    assert!(matches!(err, MontageError::Transcode { .. }));
    assert!(!service
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Deliver(..))));
    assert_eq!(service.cleanups(), 1);
    assert_eq!(
        *stages.lock().unwrap(),
        vec![ExportStage::Preparing, ExportStage::Trimming, ExportStage::Failed]
    );
}

#[tokio::test]
async fn progress_ends_complete_at_one() {
    let mut project = Project::new("progress");
    let track = project.add_track(MediaKind::Video);
    let a = ready_asset(&mut project, "a.mp4", 2.0);
    project.add_clip(track, a, 0.0, None).unwrap();

    let reports = Arc::new(Mutex::new(vec![]));
    let sink = reports.clone();
    let progress: ProgressCallback =
        Box::new(move |p| sink.lock().unwrap().push((p.stage, p.progress)));

    let service = FakeService::default();
    export_timeline(&project, &service, &job(), Some(progress))
        .await
        .unwrap();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.first().map(|r| r.0), Some(ExportStage::Preparing));
    assert_eq!(reports.last().copied(), Some((ExportStage::Complete, 1.0)));
    assert!(reports.windows(2).all(|w| w[0].1 <= w[1].1));
}
