//! Rendering backend seam.
//!
//! The proxy runner drives encodes only through these traits, so any
//! implementation exposing pull-style progress can stand in for FFmpeg.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vproxy_models::{ProxyEncoding, ProxyProfile};

use crate::error::MediaResult;
use crate::timeline::{SourceClip, Timeline};

/// Output side of an encode.
#[derive(Debug, Clone)]
pub struct EncodeSink {
    pub output_path: PathBuf,
    pub profile: Arc<ProxyProfile>,
    pub encoding: ProxyEncoding,
    /// Video bitrate override (e.g. "500k")
    pub video_bitrate: String,
}

/// A backend that can open sources and run encodes.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Open a decodable source, measuring it at the profile frame rate.
    async fn open_source(&self, path: &Path, profile: &ProxyProfile) -> MediaResult<SourceClip>;

    /// Launch an encode of `timeline` into `sink`. Returns once the encode
    /// is running.
    async fn start_encode(
        &self,
        timeline: &Timeline,
        sink: &EncodeSink,
    ) -> MediaResult<Box<dyn EncodeHandle>>;
}

/// A running encode.
#[async_trait]
pub trait EncodeHandle: Send + Sync {
    /// Completed fraction in `[0, 1]`.
    fn progress_fraction(&self) -> f64;

    /// Drive rate. Drops to zero when the encode finished, failed or was stopped.
    fn speed(&self) -> f64;

    /// Error reported by the encode, once it has stopped on its own.
    fn failure(&self) -> Option<String>;

    /// Halt the encode. Idempotent; returns when the encode has stopped.
    async fn stop(&self);
}
