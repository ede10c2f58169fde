pub mod clip;
pub mod export;
pub mod import;
pub mod info;
pub mod init;
pub mod preview;
pub mod track;
pub mod validate;

use montage_common::config::AppConfig;
use montage_project_model::{DirectoryStore, PersistenceStore, ProjectBundle};

pub fn open_store(config: &AppConfig) -> DirectoryStore {
    DirectoryStore::new(&config.projects_dir)
}

pub fn load(config: &AppConfig, id: &str) -> anyhow::Result<ProjectBundle> {
    open_store(config)
        .load_project(id)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

pub fn save(config: &AppConfig, bundle: &ProjectBundle) -> anyhow::Result<String> {
    open_store(config)
        .save_project(bundle)
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))
}
