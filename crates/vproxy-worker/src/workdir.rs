//! Private working directory for transient proxy files.
//!
//! Holds the proxy profile description of the running render session and
//! the project snapshot of the running conversion. Both are scratch state
//! and are overwritten by later sessions.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use vproxy_models::ProxyProfile;

use crate::error::ProxyResult;

/// File name of the proxy profile description.
pub const PROFILE_FILE_NAME: &str = "proxy_profile";

/// File name of the conversion project snapshot.
pub const SNAPSHOT_FILE_NAME: &str = "proxy_conv.json";

#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed.
    pub fn ensure(&self) -> ProxyResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn profile_path(&self) -> PathBuf {
        self.root.join(PROFILE_FILE_NAME)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE_NAME)
    }

    /// Write the profile description file for a render session.
    pub fn write_profile(&self, profile: &ProxyProfile) -> ProxyResult<ProfileFile> {
        self.ensure()?;
        let path = self.profile_path();
        std::fs::write(&path, profile.to_description())?;
        debug!("Wrote proxy profile {}x{} to {}", profile.width, profile.height, path.display());
        Ok(ProfileFile { path })
    }
}

/// A written profile description file, removed on drop.
#[derive(Debug)]
pub struct ProfileFile {
    path: PathBuf,
}

impl ProfileFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the profile back from disk.
    pub fn load(&self) -> ProxyResult<ProxyProfile> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(ProxyProfile::from_description(&text)?)
    }
}

impl Drop for ProfileFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed proxy profile {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove proxy profile {}: {}", self.path.display(), e),
        }
    }
}
