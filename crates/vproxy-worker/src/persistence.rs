//! Project persistence.

use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use vproxy_models::Project;

use crate::error::{ProjectLoadError, ProxyError, ProxyResult};

/// Saves and loads whole projects.
pub trait ProjectStore: Send + Sync {
    /// Serialize `project` to `path`, replacing any existing file.
    fn save(&self, project: &Project, path: &Path) -> ProxyResult<()>;

    /// Load a project. `show_messages` controls whether problems are reported
    /// to the user-facing log as they are found.
    fn load(&self, path: &Path, show_messages: bool) -> Result<Project, ProjectLoadError>;
}

/// JSON project files.
#[derive(Debug, Clone, Default)]
pub struct JsonProjectStore;

impl JsonProjectStore {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectStore for JsonProjectStore {
    fn save(&self, project: &Project, path: &Path) -> ProxyResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Write next to the target, then rename over it
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, project)
            .map_err(|e| ProxyError::persistence(format!("serialize project: {}", e)))?;
        tmp.flush()?;
        tmp.persist(path)
            .map_err(|e| ProxyError::persistence(format!("write {}: {}", path.display(), e)))?;

        debug!("Saved project '{}' to {}", project.name, path.display());
        Ok(())
    }

    fn load(&self, path: &Path, show_messages: bool) -> Result<Project, ProjectLoadError> {
        let bytes = std::fs::read(path)?;
        let project: Project = serde_json::from_slice(&bytes)?;

        for item in project.media.iter().filter(|m| !m.is_proxy) {
            if !item.path.exists() {
                if show_messages {
                    warn!("Media file not found: {}", item.path.display());
                }
                return Err(ProjectLoadError::MediaNotFound(item.path.clone()));
            }
        }

        Ok(project)
    }
}
