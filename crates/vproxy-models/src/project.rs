//! Project state relevant to proxy editing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{MediaId, MediaItem, VideoProfile};

/// Default number of video tracks in a sequence.
pub const DEFAULT_VIDEO_TRACKS: u32 = 5;
/// Default number of audio tracks in a sequence.
pub const DEFAULT_AUDIO_TRACKS: u32 = 4;

/// Which media the project edits with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectProxyMode {
    /// Editing with original media
    #[default]
    UseOriginal,
    /// Editing with proxy media
    UseProxy,
    /// Switch to proxy media in progress; edits are suppressed
    ConvertingToProxy,
}

impl ProjectProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectProxyMode::UseOriginal => "use_original",
            ProjectProxyMode::UseProxy => "use_proxy",
            ProjectProxyMode::ConvertingToProxy => "converting_to_proxy",
        }
    }
}

impl fmt::Display for ProjectProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When proxies get created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyCreateMode {
    /// Only when explicitly requested
    #[default]
    Manual,
    /// For every video file when the project is opened
    AllVideoOnOpen,
}

/// Per-project proxy editing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProxyEditingData {
    #[serde(default)]
    pub proxy_mode: ProjectProxyMode,
    #[serde(default)]
    pub create_mode: ProxyCreateMode,
}

/// A timeline sequence; only its track layout matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Sequence {
    pub name: String,
    pub video_tracks: u32,
    pub audio_tracks: u32,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            video_tracks: DEFAULT_VIDEO_TRACKS,
            audio_tracks: DEFAULT_AUDIO_TRACKS,
        }
    }
}

/// Proxy coverage of a project's video media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProxyStatus {
    pub video_files: usize,
    pub proxy_files: usize,
}

impl fmt::Display for ProxyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "There are {} proxy file(s) for {} video file(s)",
            self.proxy_files, self.video_files
        )
    }
}

/// An editing project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub name: String,
    pub profile: VideoProfile,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
    #[serde(default)]
    pub proxy_data: ProxyEditingData,
}

impl Project {
    /// New project with one default sequence.
    pub fn new(name: impl Into<String>, profile: VideoProfile) -> Self {
        Self {
            name: name.into(),
            profile,
            media: Vec::new(),
            sequences: vec![Sequence::new("sequence 1")],
            proxy_data: ProxyEditingData::default(),
        }
    }

    pub fn proxy_mode(&self) -> ProjectProxyMode {
        self.proxy_data.proxy_mode
    }

    pub fn set_proxy_mode(&mut self, mode: ProjectProxyMode) {
        self.proxy_data.proxy_mode = mode;
    }

    /// Add a media item, returning its id.
    pub fn add_media(&mut self, item: MediaItem) -> MediaId {
        let id = item.id.clone();
        self.media.push(item);
        id
    }

    pub fn media_item(&self, id: &MediaId) -> Option<&MediaItem> {
        self.media.iter().find(|m| &m.id == id)
    }

    pub fn media_item_mut(&mut self, id: &MediaId) -> Option<&mut MediaItem> {
        self.media.iter_mut().find(|m| &m.id == id)
    }

    /// Copy committed proxies from `other` onto items with the same id that
    /// have none attached.
    pub fn carry_proxies_from(&mut self, other: &Project) {
        for item in self.media.iter_mut().filter(|m| !m.has_proxy) {
            let committed = other
                .media_item(&item.id)
                .filter(|m| m.has_proxy)
                .and_then(|m| m.proxy_path.as_ref());
            if let Some(path) = committed {
                item.attach_proxy(path);
            }
        }
    }

    /// Normalize every sequence to the given track counts.
    pub fn set_track_counts(&mut self, video_tracks: u32, audio_tracks: u32) {
        for seq in &mut self.sequences {
            seq.video_tracks = video_tracks;
            seq.audio_tracks = audio_tracks;
        }
    }

    /// Count video items and how many of them have (or are) proxies.
    pub fn proxy_status(&self) -> ProxyStatus {
        self.media
            .iter()
            .filter(|m| m.is_video())
            .fold(ProxyStatus::default(), |mut status, m| {
                status.video_files += 1;
                if m.has_proxy || m.is_proxy {
                    status.proxy_files += 1;
                }
                status
            })
    }
}
