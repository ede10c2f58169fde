//! Clip placement and splitting.

use montage_common::config::AppConfig;
use montage_project_model::{AssetId, ClipId, CommandOutcome, EditCommand, TrackId};

pub fn add(
    config: &AppConfig,
    id: &str,
    track: u64,
    asset: u64,
    start: f64,
    duration: Option<f64>,
    level: Option<f64>,
) -> anyhow::Result<()> {
    let mut bundle = super::load(config, id)?;
    let project = &mut bundle.project;

    let outcome = project.apply(EditCommand::AddClip {
        track_id: TrackId(track),
        asset_id: AssetId(asset),
        start_secs: start,
        group_id: None,
    })?;
    let CommandOutcome::ClipAdded(clip_id) = outcome else {
        anyhow::bail!("unexpected outcome {outcome:?}");
    };

    // Nothing is saved unless every step succeeds.
    let mut follow_ups = vec![];
    if let Some(duration_secs) = duration {
        follow_ups.push(EditCommand::ResizeClip {
            clip_id,
            duration_secs,
        });
    }
    if let Some(level) = level {
        follow_ups.push(EditCommand::SetClipLevel { clip_id, level });
    }
    for command in follow_ups {
        project.apply(command)?;
    }

    super::save(config, &bundle)?;
    println!("Added clip {clip_id}");
    Ok(())
}

pub fn split(config: &AppConfig, id: &str, clip: u64, at: f64) -> anyhow::Result<()> {
    let mut bundle = super::load(config, id)?;
    let outcome = bundle.project.apply(EditCommand::SplitClip {
        clip_id: ClipId(clip),
        at_secs: at,
    })?;
    super::save(config, &bundle)?;

    if let CommandOutcome::ClipSplit { original, created } = outcome {
        println!("Split {original} at {at:.2}s; new clip {created}");
    }
    Ok(())
}
