//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use vproxy_models::{MediaId, ProfileParseError, ProjectProxyMode};

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("No render folder configured")]
    RenderFolderMissing,

    #[error("Render folder must not be the home directory: {0}")]
    RenderFolderIsHome(PathBuf),

    #[error("Media item not found: {0}")]
    MediaNotFound(MediaId),

    #[error("Cannot convert project in mode {0}")]
    InvalidModeTransition(ProjectProxyMode),

    #[error("A proxy conversion is already running")]
    ConversionInProgress,

    #[error("Project persistence failed: {0}")]
    Persistence(String),

    #[error("Invalid proxy profile file: {0}")]
    Profile(#[from] ProfileParseError),

    #[error("Media error: {0}")]
    Media(#[from] vproxy_media::MediaError),

    #[error("Project load error: {0}")]
    Load(#[from] ProjectLoadError),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

/// Errors raised while loading a serialized project.
#[derive(Debug, Error)]
pub enum ProjectLoadError {
    /// A media file referenced by the project does not exist.
    #[error("Referenced media file not found: {0}")]
    MediaNotFound(PathBuf),

    #[error("Project file is not valid: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
