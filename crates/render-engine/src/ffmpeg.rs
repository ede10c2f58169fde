//! ffmpeg-backed transcoding service.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use montage_common::config::ExportDefaults;
use montage_common::error::{MontageError, MontageResult};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::export::{MediaHandle, OutputFormat, TranscodingService};

/// Seconds without progress before ffmpeg is reported as stalled.
const STALL_WARNING_SECS: u64 = 10;

/// Runs each transcoding step as an ffmpeg process.
///
/// Intermediate files go to a private session directory under `work_dir`,
/// removed by [`TranscodingService::cleanup`]; handles are file paths.
#[derive(Debug)]
pub struct FfmpegTranscoder {
    binary: String,
    work_dir: PathBuf,
    session_dir: PathBuf,
    video_bitrate_kbps: u32,
    audio_bitrate_kbps: u32,
    next_file: AtomicU64,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            binary: binary.into(),
            session_dir: work_dir.join(session_name()),
            work_dir,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            next_file: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ExportDefaults) -> Self {
        Self::new(config.ffmpeg_binary.clone(), config.work_dir.clone())
    }

    pub fn with_bitrates(mut self, video_kbps: u32, audio_kbps: u32) -> Self {
        self.video_bitrate_kbps = video_kbps;
        self.audio_bitrate_kbps = audio_kbps;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Directory holding this transcoder's intermediate files.
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Whether the ffmpeg binary can be found.
    pub async fn is_available(&self) -> bool {
        command_exists(&self.binary).await
    }

    async fn next_output(&self, stem: &str, extension: &str) -> MontageResult<PathBuf> {
        tokio::fs::create_dir_all(&self.session_dir).await?;
        let n = self.next_file.fetch_add(1, Ordering::Relaxed);
        Ok(self.session_dir.join(format!("{stem}-{n:04}.{extension}")))
    }

    async fn run_ffmpeg(&self, args: &[String], expected_duration_secs: Option<f64>) -> MontageResult<()> {
        tracing::debug!(binary = %self.binary, args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(["-hide_banner", "-nostats", "-progress", "pipe:1"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MontageError::transcode(format!("Failed to start {}: {e}", self.binary)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MontageError::transcode("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MontageError::transcode("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks on a full stderr pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        let mut last_advance_secs = 0.0f64;
        let mut last_advance_wall = Instant::now();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| MontageError::transcode(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key != "progress" {
                continue;
            }

            if state.out_time_secs > last_advance_secs + 0.001 {
                last_advance_secs = state.out_time_secs;
                last_advance_wall = Instant::now();
                if let Some(expected) = expected_duration_secs.filter(|d| *d > 0.0) {
                    tracing::trace!(
                        fraction = (state.out_time_secs / expected).clamp(0.0, 1.0),
                        "ffmpeg progress"
                    );
                }
            } else if last_advance_wall.elapsed().as_secs() >= STALL_WARNING_SECS {
                tracing::warn!(
                    out_time_secs = state.out_time_secs,
                    "No ffmpeg progress advancement for {STALL_WARNING_SECS}s"
                );
                last_advance_wall = Instant::now();
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| MontageError::transcode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(MontageError::transcode(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        tracing::debug!(
            out_time_secs = state.out_time_secs,
            reached_end = state.complete,
            "ffmpeg finished"
        );
        Ok(())
    }

    fn codec_args(&self, format: OutputFormat) -> Vec<String> {
        codec_args_for_format(format, self.video_bitrate_kbps, self.audio_bitrate_kbps)
    }
}

#[async_trait]
impl TranscodingService for FfmpegTranscoder {
    async fn concatenate(
        &self,
        inputs: &[MediaHandle],
        format: OutputFormat,
    ) -> MontageResult<MediaHandle> {
        if inputs.is_empty() {
            return Err(MontageError::transcode("Nothing to concatenate"));
        }

        let list_path = self.next_output("concat", "txt").await?;
        tokio::fs::write(&list_path, concat_list(inputs)).await?;
        let output = self.next_output("joined", format.extension()).await?;

        let mut args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_path.display().to_string(),
        ];
        args.extend(self.codec_args(format));
        args.push(output.display().to_string());

        self.run_ffmpeg(&args, None).await?;
        tracing::info!(pieces = inputs.len(), output = %output.display(), "Concatenated media");
        Ok(MediaHandle::new(output.display().to_string()))
    }

    async fn trim(
        &self,
        input: &MediaHandle,
        start_secs: f64,
        duration_secs: f64,
        format: OutputFormat,
    ) -> MontageResult<MediaHandle> {
        let output = self.next_output("trim", format.extension()).await?;
        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{start_secs:.6}"),
            "-t".to_string(),
            format!("{duration_secs:.6}"),
            "-i".to_string(),
            input.to_string(),
        ];
        args.extend(self.codec_args(format));
        args.push(output.display().to_string());

        self.run_ffmpeg(&args, Some(duration_secs)).await?;
        Ok(MediaHandle::new(output.display().to_string()))
    }

    async fn apply_opacity(&self, input: &MediaHandle, level: f64) -> MontageResult<MediaHandle> {
        let format = format_for_path(Path::new(input.as_str()));
        let output = self.next_output("fade", format.extension()).await?;
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string(),
            "-vf".to_string(),
            opacity_filter(level),
        ];
        args.extend(self.codec_args(format));
        args.push(output.display().to_string());

        self.run_ffmpeg(&args, None).await?;
        Ok(MediaHandle::new(output.display().to_string()))
    }

    async fn deliver(&self, media: &MediaHandle, destination: &Path) -> MontageResult<PathBuf> {
        let source = Path::new(media.as_str());
        if tokio::fs::rename(source, destination).await.is_err() {
            // Work dir may live on another filesystem.
            tokio::fs::copy(source, destination).await?;
            tokio::fs::remove_file(source).await.ok();
        }
        Ok(destination.to_path_buf())
    }

    async fn cleanup(&self) -> MontageResult<()> {
        match tokio::fs::remove_dir_all(&self.session_dir).await {
            Ok(()) => {
                tracing::debug!(dir = %self.session_dir.display(), "Removed export work files");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Unique per transcoder, so concurrent exports never share files.
fn session_name() -> String {
    static SESSIONS: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = SESSIONS.fetch_add(1, Ordering::Relaxed);
    format!("export-{}-{nanos:x}-{n}", std::process::id())
}

/// Opacity over black: every colour channel is scaled by `level`.
fn opacity_filter(level: f64) -> String {
    let l = level.clamp(0.0, 1.0);
    format!("format=gbrp,colorchannelmixer=rr={l:.4}:gg={l:.4}:bb={l:.4},format=yuv420p")
}

/// Input list for ffmpeg's concat demuxer.
fn concat_list(inputs: &[MediaHandle]) -> String {
    inputs
        .iter()
        .map(|h| format!("file '{}'\n", h.as_str().replace('\'', r"'\''")))
        .collect()
}

fn format_for_path(path: &Path) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("webm") => OutputFormat::Webm,
        _ => OutputFormat::Mp4H264,
    }
}

fn codec_args_for_format(format: OutputFormat, video_kbps: u32, audio_kbps: u32) -> Vec<String> {
    let video_bitrate = format!("{}k", video_kbps.max(1000));
    let audio_bitrate = format!("{}k", audio_kbps.max(64));

    let args: &[&str] = match format {
        OutputFormat::Mp4H264 => &[
            "-c:v", "libx264", "-preset", "medium", "-profile:v", "high", "-pix_fmt", "yuv420p",
            "-b:v", video_bitrate.as_str(), "-c:a", "aac", "-b:a", audio_bitrate.as_str(), "-movflags", "+faststart",
        ],
        OutputFormat::Mp4H265 => &[
            "-c:v", "libx265", "-preset", "medium", "-pix_fmt", "yuv420p", "-b:v", video_bitrate.as_str(),
            "-c:a", "aac", "-b:a", audio_bitrate.as_str(), "-movflags", "+faststart",
        ],
        OutputFormat::Webm => &[
            "-c:v", "libvpx-vp9", "-b:v", video_bitrate.as_str(), "-c:a", "libopus", "-b:a", "128k",
        ],
    };
    args.iter().map(|s| s.to_string()).collect()
}

async fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}
