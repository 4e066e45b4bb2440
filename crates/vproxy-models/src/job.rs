//! Proxy render job definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::MediaItem;

/// One media item queued for a proxy render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Snapshot of the item at queue time
    pub media: MediaItem,
    /// Where the proxy is written
    pub output_path: PathBuf,
}

impl RenderJob {
    /// Create a job writing into `proxies_dir`.
    pub fn for_item(media: MediaItem, proxies_dir: &Path) -> Self {
        let output_path = media.proxy_output_path(proxies_dir);
        Self { media, output_path }
    }

    pub fn label(&self) -> &str {
        &self.media.name
    }
}

/// Lifecycle of a single render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the session queue
    #[default]
    Pending,
    /// Encode running
    Encoding,
    /// Proxy attached to the media item
    Committed,
    /// Stopped by an abort request
    Aborted,
    /// Backend error
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Encoding => "encoding",
            JobState::Committed => "committed",
            JobState::Aborted => "aborted",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
