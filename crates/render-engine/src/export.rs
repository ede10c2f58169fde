//! Export jobs and the transcoding driver.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{Project, SourceHandle};
use serde::{Deserialize, Serialize};

use crate::flatten::{flatten, RenderPlan};

/// Container and codec family of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "mp4-h264")]
    Mp4H264,
    #[serde(rename = "mp4-h265")]
    Mp4H265,
    #[serde(rename = "webm")]
    Webm,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4H264 => "mp4-h264",
            OutputFormat::Mp4H265 => "mp4-h265",
            OutputFormat::Webm => "webm",
        }
    }

    /// File extension for intermediate and final files.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4H264 | OutputFormat::Mp4H265 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4-h264" | "mp4" | "h264" => Ok(OutputFormat::Mp4H264),
            "mp4-h265" | "h265" | "hevc" => Ok(OutputFormat::Mp4H265),
            "webm" => Ok(OutputFormat::Webm),
            other => Err(MontageError::Config {
                message: format!("unknown export format '{other}'"),
            }),
        }
    }
}

/// Opaque reference to media owned by a transcoding service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&SourceHandle> for MediaHandle {
    fn from(source: &SourceHandle) -> Self {
        Self(source.as_str().to_string())
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The media operations an export needs.
///
/// Every call may fail with [`MontageError::Transcode`]; the driver aborts
/// the whole export on the first failure.
#[async_trait]
pub trait TranscodingService: Send + Sync {
    /// Join media back to back, in the given order.
    async fn concatenate(
        &self,
        inputs: &[MediaHandle],
        format: OutputFormat,
    ) -> MontageResult<MediaHandle>;

    /// Cut `[start, start + duration)` out of `input`.
    async fn trim(
        &self,
        input: &MediaHandle,
        start_secs: f64,
        duration_secs: f64,
        format: OutputFormat,
    ) -> MontageResult<MediaHandle>;

    /// Scale the picture's opacity to `level` in `[0, 1]`.
    async fn apply_opacity(&self, input: &MediaHandle, level: f64) -> MontageResult<MediaHandle>;

    /// Move finished media to its destination.
    async fn deliver(&self, media: &MediaHandle, destination: &Path) -> MontageResult<PathBuf>;

    /// Drop intermediate media. Runs once an export ends, whether it
    /// succeeded or not.
    async fn cleanup(&self) -> MontageResult<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// An export ready to run.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Final output file.
    pub output_path: PathBuf,

    pub format: OutputFormat,
}

impl ExportJob {
    pub fn new(output_path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_path: output_path.into(),
            format,
        }
    }
}

/// Progress callback for exports.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Transcoding steps finished so far.
    pub steps_done: usize,

    pub total_steps: usize,

    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Trimming,
    Fading,
    Concatenating,
    Complete,
    Failed,
}

struct ProgressReporter<'a> {
    callback: Option<&'a ProgressCallback>,
    steps_done: usize,
    total_steps: usize,
}

impl ProgressReporter<'_> {
    fn report(&self, stage: ExportStage) {
        let Some(cb) = self.callback else {
            return;
        };
        let progress = match stage {
            ExportStage::Complete => 1.0,
            _ if self.total_steps == 0 => 0.0,
            _ => (self.steps_done as f64 / self.total_steps as f64).clamp(0.0, 1.0),
        };
        cb(ExportProgress {
            progress,
            steps_done: self.steps_done,
            total_steps: self.total_steps,
            stage,
        });
    }

    fn step(&mut self, stage: ExportStage) {
        self.steps_done += 1;
        self.report(stage);
    }
}

/// Transcoding calls an export of `plan` will issue.
fn count_steps(plan: &RenderPlan) -> usize {
    let per_unit: usize = plan
        .units
        .iter()
        .map(|u| u.segments().len() + usize::from(u.needs_fade_pass))
        .sum();
    // concatenate + deliver
    per_unit + 2
}

/// Export the project's video tracks to a single file.
///
/// Every clip is trimmed out of its source (once per loop repetition),
/// faded when its level is below 1, and the pieces are concatenated in
/// timeline order. Nothing is delivered unless every step succeeds.
pub async fn export_timeline(
    project: &Project,
    service: &dyn TranscodingService,
    job: &ExportJob,
    progress: Option<ProgressCallback>,
) -> MontageResult<PathBuf> {
    tracing::info!(
        output = %job.output_path.display(),
        format = %job.format,
        service = service.name(),
        "Starting export"
    );

    let plan = flatten(project)?;
    let mut reporter = ProgressReporter {
        callback: progress.as_ref(),
        steps_done: 0,
        total_steps: count_steps(&plan),
    };
    reporter.report(ExportStage::Preparing);

    let result = run_plan(&plan, service, job, &mut reporter).await;
    if let Err(err) = service.cleanup().await {
        tracing::warn!(error = %err, service = service.name(), "Failed to remove export work files");
    }
    match &result {
        Ok(path) => {
            reporter.report(ExportStage::Complete);
            tracing::info!(
                output = %path.display(),
                units = plan.units.len(),
                duration_secs = plan.total_duration_secs(),
                "Export finished"
            );
        }
        Err(err) => {
            reporter.report(ExportStage::Failed);
            tracing::warn!(error = %err, "Export failed");
        }
    }
    result
}

async fn run_plan(
    plan: &RenderPlan,
    service: &dyn TranscodingService,
    job: &ExportJob,
    reporter: &mut ProgressReporter<'_>,
) -> MontageResult<PathBuf> {
    let mut pieces = Vec::with_capacity(plan.units.len());

    for unit in &plan.units {
        let source = MediaHandle::from(&unit.source);
        let segments = unit.segments();
        tracing::debug!(
            clip = %unit.clip_id,
            segments = segments.len(),
            loop_count = unit.loop_count,
            "Preparing media unit"
        );

        for segment in segments {
            let mut piece = service
                .trim(&source, segment.start_secs, segment.duration_secs, job.format)
                .await?;
            reporter.step(ExportStage::Trimming);

            if unit.needs_fade_pass {
                piece = service.apply_opacity(&piece, unit.level).await?;
                reporter.step(ExportStage::Fading);
            }
            pieces.push(piece);
        }
    }

    let joined = service.concatenate(&pieces, job.format).await?;
    reporter.step(ExportStage::Concatenating);

    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let delivered = service.deliver(&joined, &job.output_path).await?;
    reporter.steps_done = reporter.total_steps;
    Ok(delivered)
}
