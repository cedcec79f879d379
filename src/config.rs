//! Stream configuration
//!
//! Geometry and sample layout a stream is opened with. Headerless formats
//! depend on it entirely; formats with a header override what they can.

use crate::error::{Error, Result};
use crate::format::{bytes_per_frame, PixelFormat};
use crate::types::{Endianness, Framerate, Resolution};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Frame width in pixels (0 = taken from the file)
    pub width: u32,
    /// Frame height in pixels (0 = taken from the file)
    pub height: u32,
    /// Pixel format, written by name in config files
    #[serde(with = "format_name")]
    pub format: PixelFormat,
    /// Bits per sample (1..=16)
    pub bits_per_sample: u32,
    /// Byte order of 16-bit samples
    pub endianness: Endianness,
    /// Samples are signed values stored around the half value
    pub has_negative_values: bool,
    /// Nominal frame rate
    pub frame_rate: Framerate,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: PixelFormat::Yuv420p,
            bits_per_sample: 8,
            endianness: Endianness::Little,
            has_negative_values: false,
            frame_rate: Framerate::FPS_30,
        }
    }
}

impl StreamConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits_per_sample = bits;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_negative_values(mut self, has_negative_values: bool) -> Self {
        self.has_negative_values = has_negative_values;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_rate = Framerate::new(fps, 1);
        self
    }

    /// Build a configuration from command line style strings.
    ///
    /// `resolution` accepts `WxH` or a standard resolution name; an empty
    /// string leaves the geometry unset.
    pub fn from_strings(
        resolution: &str,
        format: &str,
        bits: u32,
        endianness: &str,
        has_negative_values: bool,
        fps: u32,
    ) -> Result<Self> {
        let mut config = Self::default()
            .with_bits(bits)
            .with_negative_values(has_negative_values)
            .with_fps(fps);
        if !resolution.trim().is_empty() {
            let res = Resolution::parse(resolution)?;
            config = config.with_resolution(res.width, res.height);
        }
        if !format.trim().is_empty() {
            config.format = PixelFormat::from_name(format)?;
        }
        if !endianness.trim().is_empty() {
            config.endianness = endianness.parse()?;
        }
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Whether both dimensions are known
    pub fn has_geometry(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Packed size of one frame, 0 while the geometry is unset
    pub fn bytes_per_frame(&self) -> u64 {
        if !self.has_geometry() {
            return 0;
        }
        bytes_per_frame(self.width, self.height, self.format, self.bits_per_sample)
    }
}

mod format_name {
    use crate::format::PixelFormat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(format: &PixelFormat, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(format.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PixelFormat, D::Error> {
        let name = String::deserialize(d)?;
        PixelFormat::from_name(&name).map_err(serde::de::Error::custom)
    }
}
