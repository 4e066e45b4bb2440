//! Video profiles and proxy profile derivation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Description written into derived proxy profiles.
pub const PROXY_PROFILE_DESCRIPTION: &str = "proxy render profile";

/// Proxy dimensions are aligned to this many pixels (encoder macroblocks).
pub const PROXY_DIMENSION_ALIGN: u32 = 8;

/// Geometry and timing of a video format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoProfile {
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub sample_aspect_num: u32,
    pub sample_aspect_den: u32,
    pub display_aspect_num: u32,
    pub display_aspect_den: u32,
    pub progressive: bool,
}

impl VideoProfile {
    /// Square-pixel progressive profile with the display aspect reduced from the frame size.
    pub fn new(width: u32, height: u32, frame_rate_num: u32, frame_rate_den: u32) -> Self {
        let g = gcd(width, height).max(1);
        Self {
            description: format!("{}x{}", width, height),
            width,
            height,
            frame_rate_num,
            frame_rate_den,
            sample_aspect_num: 1,
            sample_aspect_den: 1,
            display_aspect_num: width / g,
            display_aspect_den: height / g,
            progressive: true,
        }
    }

    /// Frames per second as a float.
    pub fn fps(&self) -> f64 {
        if self.frame_rate_den == 0 {
            return 0.0;
        }
        self.frame_rate_num as f64 / self.frame_rate_den as f64
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Error parsing a profile description file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileParseError {
    #[error("missing profile key: {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Reduced rendering profile used for proxy encodes.
///
/// One instance is built per render session and shared read-only by every
/// job in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProxyProfile {
    pub width: u32,
    pub height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub sample_aspect_num: u32,
    pub sample_aspect_den: u32,
    pub display_aspect_num: u32,
    pub display_aspect_den: u32,
    /// Always true for proxies
    pub progressive: bool,
}

/// Half of `dim`, rounded down to a multiple of [`PROXY_DIMENSION_ALIGN`].
pub fn proxy_dimension(dim: u32) -> u32 {
    let half = dim / 2;
    half - half % PROXY_DIMENSION_ALIGN
}

impl ProxyProfile {
    /// Derive the proxy profile for a project profile.
    pub fn derive(source: &VideoProfile) -> Self {
        Self {
            width: proxy_dimension(source.width),
            height: proxy_dimension(source.height),
            frame_rate_num: source.frame_rate_num,
            frame_rate_den: source.frame_rate_den,
            sample_aspect_num: source.sample_aspect_num,
            sample_aspect_den: source.sample_aspect_den,
            display_aspect_num: source.display_aspect_num,
            display_aspect_den: source.display_aspect_den,
            progressive: true,
        }
    }

    pub fn fps(&self) -> f64 {
        if self.frame_rate_den == 0 {
            return 0.0;
        }
        self.frame_rate_num as f64 / self.frame_rate_den as f64
    }

    /// Render the `key=value` profile description file.
    pub fn to_description(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("description={}\n", PROXY_PROFILE_DESCRIPTION));
        out.push_str(&format!("frame_rate_num={}\n", self.frame_rate_num));
        out.push_str(&format!("frame_rate_den={}\n", self.frame_rate_den));
        out.push_str(&format!("width={}\n", self.width));
        out.push_str(&format!("height={}\n", self.height));
        out.push_str(&format!("progressive={}\n", u8::from(self.progressive)));
        out.push_str(&format!("sample_aspect_num={}\n", self.sample_aspect_num));
        out.push_str(&format!("sample_aspect_den={}\n", self.sample_aspect_den));
        out.push_str(&format!("display_aspect_num={}\n", self.display_aspect_num));
        out.push_str(&format!("display_aspect_den={}\n", self.display_aspect_den));
        out
    }

    /// Parse a profile description written by [`ProxyProfile::to_description`].
    ///
    /// Unknown keys are ignored.
    pub fn from_description(text: &str) -> Result<Self, ProfileParseError> {
        let pairs: Vec<(&str, &str)> = text
            .lines()
            .filter_map(|line| line.trim().split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let get = |key: &'static str| -> Result<u32, ProfileParseError> {
            let value = pairs
                .iter()
                .rev()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or(ProfileParseError::MissingKey(key))?;
            value.parse().map_err(|_| ProfileParseError::InvalidValue {
                key,
                value: value.to_string(),
            })
        };

        Ok(Self {
            width: get("width")?,
            height: get("height")?,
            frame_rate_num: get("frame_rate_num")?,
            frame_rate_den: get("frame_rate_den")?,
            sample_aspect_num: get("sample_aspect_num")?,
            sample_aspect_den: get("sample_aspect_den")?,
            display_aspect_num: get("display_aspect_num")?,
            display_aspect_den: get("display_aspect_den")?,
            progressive: get("progressive")? != 0,
        })
    }
}
