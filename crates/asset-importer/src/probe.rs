//! Media duration probes.
//!
//! The importer never decodes media itself. It asks a [`MetadataProbe`] for
//! the playable length of a source and records the answer on the asset.

use std::process::Stdio;

use async_trait::async_trait;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::SourceHandle;
use serde::Deserialize;
use tokio::process::Command;

/// Resolves the true duration of a media source.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    /// Playable length of the source in seconds.
    async fn probe_duration(&self, source: &SourceHandle) -> MontageResult<f64>;

    /// Probe name for logging.
    fn name(&self) -> &str;
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check whether the configured binary can be executed.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Extract `format.duration` from `ffprobe -of json` output.
fn parse_probe_output(raw: &str) -> MontageResult<f64> {
    let parsed: ProbeOutput = serde_json::from_str(raw)?;
    let duration = parsed
        .format
        .duration
        .ok_or_else(|| MontageError::import("ffprobe reported no duration"))?;
    let secs = duration
        .trim()
        .parse::<f64>()
        .map_err(|e| MontageError::import(format!("invalid duration '{duration}': {e}")))?;
    if !(secs.is_finite() && secs > 0.0) {
        return Err(MontageError::import(format!(
            "non-positive duration {secs}"
        )));
    }
    Ok(secs)
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    async fn probe_duration(&self, source: &SourceHandle) -> MontageResult<f64> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(source.as_str())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MontageError::import(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MontageError::import(format!(
                "{} failed for {source}: {}",
                self.binary,
                stderr.trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}
