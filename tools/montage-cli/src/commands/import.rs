//! Import a media file into a project.

use std::path::PathBuf;

use montage_asset_importer::{AssetImporter, ImportSource, ImportStatus};
use montage_common::config::AppConfig;

pub async fn run(
    config: &AppConfig,
    id: &str,
    file: PathBuf,
    kind: Option<String>,
    embed: bool,
) -> anyhow::Result<()> {
    let mut bundle = super::load(config, id)?;
    let source = ImportSource::from_path(&file, kind.as_deref())?;
    println!("Importing {} as {}", file.display(), source.declared_kind);

    let mut importer = AssetImporter::with_ffprobe(config.import.clone());
    let asset_id = importer.import_asset(&mut bundle.project, source)?;
    importer.wait_idle(&mut bundle.project).await;

    if embed {
        let bytes = tokio::fs::read(&file).await?;
        println!("  Embedded {} bytes", bytes.len());
        bundle.payloads.insert(asset_id, bytes);
    }
    super::save(config, &bundle)?;

    match importer.queue().status(asset_id) {
        Some(ImportStatus::Resolved { duration_secs }) => {
            println!("  Asset {asset_id} ready ({duration_secs:.2}s)");
        }
        Some(ImportStatus::Failed { message }) => {
            println!("  Asset {asset_id} is still processing: {message}");
            println!("  Clips can use it, but export will refuse until it resolves.");
        }
        Some(ImportStatus::Pending) | None => {
            println!("  Asset {asset_id} is still processing");
        }
    }
    Ok(())
}
