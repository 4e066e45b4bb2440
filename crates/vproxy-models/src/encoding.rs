//! Proxy encoding preset.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Video codec used for proxy renditions (H.264)
pub const PROXY_VIDEO_CODEC: &str = "libx264";
/// Encoder speed preset; proxies favour encode speed over size
pub const PROXY_PRESET: &str = "veryfast";
/// Audio codec for proxy renditions
pub const PROXY_AUDIO_CODEC: &str = "aac";
/// Audio bitrate for proxy renditions
pub const PROXY_AUDIO_BITRATE: &str = "128k";
/// Pinned video bitrate target for proxy renditions
pub const PROXY_VIDEO_BITRATE: &str = "500k";
/// Container / file extension of proxy renditions
pub const PROXY_CONTAINER: &str = "mp4";

/// The fixed encoding preset used for every proxy render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProxyEncoding {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoder preset (e.g., "veryfast")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Container format / file extension
    #[serde(default = "default_container")]
    pub container: String,
}

fn default_video_codec() -> String {
    PROXY_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    PROXY_PRESET.to_string()
}
fn default_audio_codec() -> String {
    PROXY_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    PROXY_AUDIO_BITRATE.to_string()
}
fn default_container() -> String {
    PROXY_CONTAINER.to_string()
}

impl Default for ProxyEncoding {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            container: default_container(),
        }
    }
}

impl ProxyEncoding {
    /// The proxy preset.
    pub fn proxy() -> Self {
        Self::default()
    }

    /// Convert to FFmpeg output arguments with the given video bitrate override.
    pub fn to_ffmpeg_args(&self, video_bitrate: &str) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-b:v".to_string(),
            video_bitrate.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}
