//! Project persistence.
//!
//! A store saves a project's metadata together with the raw media payloads
//! of its assets, keyed by asset id. Two implementations are provided:
//! [`DirectoryStore`] lays projects out on disk, [`MemoryStore`] keeps them
//! in a map for tests and embedding.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ids::AssetId;
use crate::project::Project;

/// A project plus the binary media of its assets.
#[derive(Debug, Clone)]
pub struct ProjectBundle {
    pub project: Project,

    /// Raw media bytes keyed by the owning asset.
    pub payloads: BTreeMap<AssetId, Vec<u8>>,
}

impl ProjectBundle {
    /// Bundle a project without any binary payloads.
    pub fn new(project: Project) -> Self {
        Self {
            project,
            payloads: BTreeMap::new(),
        }
    }
}

/// Errors raised by persistence stores.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Invalid project id: {id:?}")]
    InvalidId { id: String },
}

impl From<PersistenceError> for montage_common::MontageError {
    fn from(err: PersistenceError) -> Self {
        montage_common::MontageError::persistence(err.to_string())
    }
}

/// Durable storage for projects.
pub trait PersistenceStore {
    /// Persist a bundle and return the id it can be loaded back with.
    fn save_project(&mut self, bundle: &ProjectBundle) -> Result<String, PersistenceError>;

    /// Load a previously saved bundle.
    fn load_project(&self, id: &str) -> Result<ProjectBundle, PersistenceError>;

    /// Remove a project and all of its payloads.
    fn delete_project(&mut self, id: &str) -> Result<(), PersistenceError>;

    /// Ids of every stored project.
    fn list_projects(&self) -> Result<Vec<String>, PersistenceError>;
}

/// Stores each project in `<root>/<id>/` with `meta/project.json` and
/// `media/<asset_id>.bin`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a single project.
    ///
    /// Ids must be a single plain path component, so no id can name a
    /// location outside the store root.
    pub fn project_dir(&self, id: &str) -> Result<PathBuf, PersistenceError> {
        let plain = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !plain {
            return Err(PersistenceError::InvalidId { id: id.to_string() });
        }
        Ok(self.root.join(id))
    }

    fn project_file(&self, id: &str) -> Result<PathBuf, PersistenceError> {
        Ok(self.project_dir(id)?.join("meta").join("project.json"))
    }

    fn media_file(dir: &Path, asset: AssetId) -> PathBuf {
        dir.join("media").join(format!("{}.bin", asset.0))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError {
    let path = path.to_path_buf();
    move |source| PersistenceError::Io { path, source }
}

impl PersistenceStore for DirectoryStore {
    fn save_project(&mut self, bundle: &ProjectBundle) -> Result<String, PersistenceError> {
        let id = bundle.project.id.clone();
        let dir = self.project_dir(&id)?;
        let meta_dir = dir.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(io_error(&meta_dir))?;

        let project_path = self.project_file(&id)?;
        let json = serde_json::to_string_pretty(&bundle.project).map_err(|e| {
            PersistenceError::Parse {
                path: project_path.clone(),
                source: e,
            }
        })?;
        std::fs::write(&project_path, json).map_err(io_error(&project_path))?;

        if !bundle.payloads.is_empty() {
            let media_dir = dir.join("media");
            std::fs::create_dir_all(&media_dir).map_err(io_error(&media_dir))?;
            for (asset, bytes) in &bundle.payloads {
                let path = Self::media_file(&dir, *asset);
                std::fs::write(&path, bytes).map_err(io_error(&path))?;
            }
        }

        tracing::info!(project = %id, path = %project_path.display(), "Project saved");
        Ok(id)
    }

    fn load_project(&self, id: &str) -> Result<ProjectBundle, PersistenceError> {
        let dir = self.project_dir(id)?;
        let project_path = self.project_file(id)?;
        if !project_path.exists() {
            return Err(PersistenceError::ProjectNotFound { id: id.to_string() });
        }

        let json = std::fs::read_to_string(&project_path).map_err(io_error(&project_path))?;
        let mut project: Project =
            serde_json::from_str(&json).map_err(|e| PersistenceError::Parse {
                path: project_path.clone(),
                source: e,
            })?;
        project.after_load();

        let mut payloads = BTreeMap::new();
        let asset_ids: Vec<AssetId> = project.assets().map(|a| a.id).collect();
        for asset in asset_ids {
            let path = Self::media_file(&dir, asset);
            if path.exists() {
                let bytes = std::fs::read(&path).map_err(io_error(&path))?;
                payloads.insert(asset, bytes);
            }
        }

        Ok(ProjectBundle { project, payloads })
    }

    fn delete_project(&mut self, id: &str) -> Result<(), PersistenceError> {
        let dir = self.project_dir(id)?;
        if !dir.exists() {
            return Err(PersistenceError::ProjectNotFound { id: id.to_string() });
        }
        std::fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
        tracing::info!(project = %id, "Project deleted");
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<String>, PersistenceError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut ids = vec![];
        for entry in std::fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let entry = entry.map_err(io_error(&self.root))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if self.project_file(&name).is_ok_and(|path| path.exists()) {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Keeps serialized projects in memory.
///
/// Projects are stored as JSON so a load returns an independent copy, the
/// same way a disk round trip would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: BTreeMap<String, (String, BTreeMap<AssetId, Vec<u8>>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn save_project(&mut self, bundle: &ProjectBundle) -> Result<String, PersistenceError> {
        let id = bundle.project.id.clone();
        let json =
            serde_json::to_string(&bundle.project).map_err(|e| PersistenceError::Parse {
                path: PathBuf::from(&id),
                source: e,
            })?;
        self.projects
            .insert(id.clone(), (json, bundle.payloads.clone()));
        Ok(id)
    }

    fn load_project(&self, id: &str) -> Result<ProjectBundle, PersistenceError> {
        let (json, payloads) = self
            .projects
            .get(id)
            .ok_or_else(|| PersistenceError::ProjectNotFound { id: id.to_string() })?;
        let mut project: Project =
            serde_json::from_str(json).map_err(|e| PersistenceError::Parse {
                path: PathBuf::from(id),
                source: e,
            })?;
        project.after_load();
        Ok(ProjectBundle {
            project,
            payloads: payloads.clone(),
        })
    }

    fn delete_project(&mut self, id: &str) -> Result<(), PersistenceError> {
        self.projects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PersistenceError::ProjectNotFound { id: id.to_string() })
    }

    fn list_projects(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.projects.keys().cloned().collect())
    }
}
