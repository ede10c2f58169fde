//! Export a project's video tracks.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_render_engine::{
    export_timeline, flatten, ExportJob, ExportProgress, FfmpegTranscoder, OutputFormat,
    ProgressCallback,
};

pub async fn run(
    config: &AppConfig,
    id: &str,
    output: Option<PathBuf>,
    format: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let bundle = super::load(config, id)?;
    let project = &bundle.project;

    if dry_run {
        let plan = flatten(project)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let format: OutputFormat = format
        .as_deref()
        .unwrap_or(&config.export.format)
        .parse()?;
    let output_path = match output {
        Some(path) => path,
        None => super::open_store(config)
            .project_dir(id)?
            .join("exports")
            .join(format!("output.{}", format.extension())),
    };

    let transcoder = FfmpegTranscoder::from_config(&config.export);
    if !transcoder.is_available().await {
        anyhow::bail!(
            "{} not found in PATH; install ffmpeg or set export.ffmpeg_binary",
            config.export.ffmpeg_binary
        );
    }

    println!("Exporting project: {}", project.name);
    println!("  Output: {}", output_path.display());
    println!("  Format: {format}");

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} steps, {:?})  ",
            p.progress * 100.0,
            p.steps_done,
            p.total_steps,
            p.stage,
        );
    });

    let job = ExportJob::new(&output_path, format);
    match export_timeline(project, &transcoder, &job, Some(progress_cb)).await {
        Ok(path) => {
            println!("\nExport complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Export failed: {e}"))
        }
    }
}
