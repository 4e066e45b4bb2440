//! Rendering backend for proxy encodes.
//!
//! This crate provides:
//! - The backend seam the proxy runner drives (`RenderBackend`, `EncodeHandle`)
//! - Minimal single-track timelines
//! - An FFmpeg CLI implementation with progress parsing from `-progress pipe:2`
//! - FFprobe source inspection

pub mod backend;
pub mod command;
pub mod error;
pub mod ffmpeg;
pub mod probe;
pub mod progress;
pub mod timeline;

pub use backend::{EncodeHandle, EncodeSink, RenderBackend};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::{FfmpegBackend, FfmpegEncodeHandle};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use timeline::{SourceClip, Timeline, TimelineClip, Track};
