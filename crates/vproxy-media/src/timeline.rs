//! Minimal timelines handed to the rendering backend.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use vproxy_models::ProxyProfile;

use crate::error::{MediaError, MediaResult};

/// A decodable source opened by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceClip {
    pub path: PathBuf,
    /// Length in frames at the profile frame rate
    pub length_frames: u64,
}

/// A placed range of a source. `out_frame` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineClip {
    pub source: PathBuf,
    pub in_frame: u64,
    pub out_frame: u64,
}

impl TimelineClip {
    pub fn length_frames(&self) -> u64 {
        self.out_frame - self.in_frame + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub clips: Vec<TimelineClip>,
}

impl Track {
    pub fn length_frames(&self) -> u64 {
        self.clips.iter().map(TimelineClip::length_frames).sum()
    }
}

/// Tracks laid out at a fixed frame rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub tracks: Vec<Track>,
}

impl Timeline {
    /// One track holding the whole source, first frame to last.
    pub fn single_clip(profile: &ProxyProfile, source: &SourceClip) -> MediaResult<Self> {
        if source.length_frames == 0 {
            return Err(MediaError::invalid_timeline(format!(
                "source {} has no frames",
                source.path.display()
            )));
        }

        Ok(Self {
            frame_rate_num: profile.frame_rate_num,
            frame_rate_den: profile.frame_rate_den,
            tracks: vec![Track {
                clips: vec![TimelineClip {
                    source: source.path.clone(),
                    in_frame: 0,
                    out_frame: source.length_frames - 1,
                }],
            }],
        })
    }

    pub fn fps(&self) -> f64 {
        if self.frame_rate_den == 0 {
            return 0.0;
        }
        self.frame_rate_num as f64 / self.frame_rate_den as f64
    }

    /// Length of the longest track.
    pub fn duration_frames(&self) -> u64 {
        self.tracks
            .iter()
            .map(Track::length_frames)
            .max()
            .unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        let fps = self.fps();
        if fps <= 0.0 {
            return 0.0;
        }
        self.duration_frames() as f64 / fps
    }

    /// The only clip, if the timeline is a single clip on a single track.
    pub fn sole_clip(&self) -> Option<&TimelineClip> {
        match self.tracks.as_slice() {
            [track] if track.clips.len() == 1 => track.clips.first(),
            _ => None,
        }
    }
}
