//! Track operations.

use montage_common::config::AppConfig;
use montage_project_model::{CommandOutcome, EditCommand, MediaKind};

pub fn add(
    config: &AppConfig,
    id: &str,
    kind: MediaKind,
    name: Option<String>,
) -> anyhow::Result<()> {
    let mut bundle = super::load(config, id)?;
    let outcome = bundle.project.apply(EditCommand::AddTrack { kind, name })?;
    super::save(config, &bundle)?;

    if let CommandOutcome::TrackAdded(track) = outcome {
        println!("Added {kind} track {track}");
    }
    Ok(())
}
