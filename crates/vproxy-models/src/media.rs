//! Media catalog entries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::encoding::PROXY_CONTAINER;

/// Unique identifier for a media item in a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    /// Generate a new random media ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of media referenced by a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}

/// A media file known to a project.
///
/// The proxy subsystem never creates or deletes items. The only mutation it
/// performs is [`MediaItem::attach_proxy`] after a proxy encode has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaItem {
    pub id: MediaId,
    /// Display name, usually the file name
    pub name: String,
    /// Path of the original media
    pub path: PathBuf,
    #[serde(default)]
    pub kind: MediaKind,
    /// A proxy rendition has been attached
    #[serde(default)]
    pub has_proxy: bool,
    /// This item itself is a proxy rendition
    #[serde(default)]
    pub is_proxy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_path: Option<PathBuf>,
}

impl MediaItem {
    /// Create a video item named after its file name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            id: MediaId::new(),
            name,
            path,
            kind: MediaKind::Video,
            has_proxy: false,
            is_proxy: false,
            proxy_path: None,
        }
    }

    /// Returns the item with a different kind.
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Where the proxy rendition of this item is written.
    ///
    /// Depends only on the source path and the directory: the source file
    /// stem plus a SHA-256 digest of the full source path, with the proxy
    /// container extension.
    pub fn proxy_output_path(&self, proxies_dir: &Path) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "media".to_string());

        let digest = Sha256::digest(self.path.to_string_lossy().as_bytes());
        proxies_dir.join(format!("{}_{:x}.{}", stem, digest, PROXY_CONTAINER))
    }

    /// Record a finished proxy rendition for this item.
    pub fn attach_proxy(&mut self, path: impl Into<PathBuf>) {
        self.has_proxy = true;
        self.proxy_path = Some(path.into());
    }

    /// True when a proxy is attached and its file still exists on disk.
    pub fn has_valid_proxy(&self) -> bool {
        self.has_proxy && self.proxy_path.as_ref().is_some_and(|p| p.exists())
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}
