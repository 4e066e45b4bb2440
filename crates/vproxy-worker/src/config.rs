//! Proxy subsystem configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vproxy_models::{DEFAULT_AUDIO_TRACKS, DEFAULT_VIDEO_TRACKS, PROXY_VIDEO_BITRATE};

use crate::error::{ProxyError, ProxyResult};

/// Name of the proxies directory inside the render folder.
pub const PROXIES_DIR_NAME: &str = "proxies";

/// Proxy subsystem configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Folder rendered clips go to; proxies live in `<render_folder>/proxies`
    pub render_folder: Option<PathBuf>,
    /// Private working directory for scratch files
    pub work_dir: PathBuf,
    /// Interval between encode progress polls
    pub poll_interval: Duration,
    /// Video bitrate target for proxy encodes
    pub video_bitrate: String,
    /// Track counts reloaded projects are normalized to
    pub video_tracks: u32,
    pub audio_tracks: u32,
    /// Autosave period
    pub autosave_interval: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            render_folder: None,
            work_dir: default_work_dir(),
            poll_interval: Duration::from_millis(100),
            video_bitrate: PROXY_VIDEO_BITRATE.to_string(),
            video_tracks: DEFAULT_VIDEO_TRACKS,
            audio_tracks: DEFAULT_AUDIO_TRACKS,
            autosave_interval: Duration::from_secs(60),
        }
    }
}

fn default_work_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".vproxy"))
        .unwrap_or_else(|_| std::env::temp_dir().join("vproxy"))
}

impl ProxyConfig {
    /// Create config from environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            render_folder: std::env::var("PROXY_RENDER_FOLDER").ok().map(PathBuf::from),
            work_dir: std::env::var("PROXY_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            poll_interval: Duration::from_millis(
                std::env::var("PROXY_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            ),
            video_bitrate: std::env::var("PROXY_VIDEO_BITRATE")
                .unwrap_or(defaults.video_bitrate),
            video_tracks: std::env::var("PROXY_VIDEO_TRACKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.video_tracks),
            audio_tracks: std::env::var("PROXY_AUDIO_TRACKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.audio_tracks),
            autosave_interval: Duration::from_secs(
                std::env::var("PROXY_AUTOSAVE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }

    /// Returns a new config with the given render folder.
    pub fn with_render_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.render_folder = Some(folder.into());
        self
    }

    /// Returns a new config with the given working directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Returns a new config with the given poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The validated render folder.
    ///
    /// Rendering straight into the home directory is refused.
    pub fn render_folder(&self) -> ProxyResult<&Path> {
        let folder = self
            .render_folder
            .as_deref()
            .ok_or(ProxyError::RenderFolderMissing)?;

        if let Ok(home) = std::env::var("HOME") {
            if !home.is_empty() && same_dir(folder, Path::new(&home)) {
                return Err(ProxyError::RenderFolderIsHome(folder.to_path_buf()));
            }
        }

        Ok(folder)
    }

    /// Directory proxy files are written to.
    pub fn proxies_dir(&self) -> ProxyResult<PathBuf> {
        Ok(self.render_folder()?.join(PROXIES_DIR_NAME))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    let a = a.canonicalize().unwrap_or_else(|_| a.to_path_buf());
    let b = b.canonicalize().unwrap_or_else(|_| b.to_path_buf());
    a == b
}
