//! Shared data models for the proxy media subsystem.
//!
//! This crate provides Serde-serializable types for:
//! - Media catalog entries and their proxy attributes
//! - Video profiles and proxy profile derivation
//! - The fixed proxy encoding preset
//! - Projects, sequences and the project proxy mode
//! - Render jobs

pub mod encoding;
pub mod job;
pub mod media;
pub mod profile;
pub mod project;

// Re-export common types
pub use encoding::{ProxyEncoding, PROXY_VIDEO_BITRATE};
pub use job::{JobState, RenderJob};
pub use media::{MediaId, MediaItem, MediaKind};
pub use profile::{proxy_dimension, ProfileParseError, ProxyProfile, VideoProfile};
pub use project::{
    Project, ProjectProxyMode, ProxyCreateMode, ProxyEditingData, ProxyStatus, Sequence,
    DEFAULT_AUDIO_TRACKS, DEFAULT_VIDEO_TRACKS,
};
