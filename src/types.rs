//! Common types used throughout GhostYUV

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    // Common resolutions
    pub const QCIF: Self = Self::new(176, 144);
    pub const CIF: Self = Self::new(352, 288);
    pub const VGA: Self = Self::new(640, 480);
    pub const HD_720P: Self = Self::new(1280, 720);
    pub const FHD_1080P: Self = Self::new(1920, 1080);
    pub const UHD_4K: Self = Self::new(3840, 2160);

    /// Calculate total pixels
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Parse "WxH" or the short name of a standard resolution ("CIF", "FullHD", ...)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(std) = STANDARD_RESOLUTIONS
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(s))
        {
            return Ok(std.resolution);
        }

        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::Configuration(format!("Invalid resolution '{}'", s)))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| Error::Configuration(format!("Invalid width in '{}'", s)))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| Error::Configuration(format!("Invalid height in '{}'", s)))?;
        Ok(Self::new(width, height))
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Named standard resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardResolution {
    pub name: &'static str,
    pub resolution: Resolution,
}

const fn std_res(name: &'static str, width: u32, height: u32) -> StandardResolution {
    StandardResolution {
        name,
        resolution: Resolution::new(width, height),
    }
}

/// Standard resolutions offered for raw files without a header
pub const STANDARD_RESOLUTIONS: &[StandardResolution] = &[
    std_res("QCIF", 176, 144),
    std_res("CIF", 352, 288),
    std_res("VGA", 640, 480),
    std_res("WVGA", 832, 480),
    std_res("XVGA", 1024, 768),
    std_res("HD", 1280, 720),
    std_res("SXGA-", 1280, 900),
    std_res("SXGA", 1280, 1024),
    std_res("WSXGA", 1440, 900),
    std_res("FullHD", 1920, 1080),
    std_res("WQXGA", 2560, 1600),
    std_res("UltraHD", 3840, 2160),
    std_res("6K 2:1", 6144, 3072),
    std_res("8K", 7680, 4320),
    std_res("8K 2:1", 8192, 4096),
];

/// Byte order of multi-byte samples on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Big,
    #[default]
    Little,
}

impl Endianness {
    pub fn name(&self) -> &'static str {
        match self {
            Endianness::Big => "big",
            Endianness::Little => "little",
        }
    }
}

impl std::str::FromStr for Endianness {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "be" => Ok(Endianness::Big),
            "little" | "le" => Ok(Endianness::Little),
            _ => Err(Error::Configuration(format!("Invalid endianness '{}'", s))),
        }
    }
}

/// Whether a stream is read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn is_input(&self) -> bool {
        matches!(self, Direction::Input)
    }
}

/// Framerate representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub den: u32,
}

impl Framerate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub const FPS_1: Self = Self::new(1, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);

    /// Get framerate as f64
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            self.num as f64
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den <= 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{:.3}", self.as_f64())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        assert_eq!(Resolution::parse("352x288").unwrap(), Resolution::CIF);
        assert_eq!(Resolution::parse("1920X1080").unwrap(), Resolution::FHD_1080P);
        assert_eq!(Resolution::parse("fullhd").unwrap(), Resolution::FHD_1080P);
        assert_eq!(
            Resolution::parse("8K 2:1").unwrap(),
            Resolution::new(8192, 4096)
        );
        assert!(Resolution::parse("352").is_err());
        assert!(Resolution::parse("axb").is_err());
    }

    #[test]
    fn test_standard_resolution_table() {
        assert_eq!(STANDARD_RESOLUTIONS.len(), 15);
        assert_eq!(STANDARD_RESOLUTIONS[0].resolution, Resolution::QCIF);
        assert_eq!(Resolution::VGA.to_string(), "640x480");
    }

    #[test]
    fn test_endianness_parse() {
        assert_eq!("BIG".parse::<Endianness>().unwrap(), Endianness::Big);
        assert_eq!("le".parse::<Endianness>().unwrap(), Endianness::Little);
        assert!("middle".parse::<Endianness>().is_err());
    }

    #[test]
    fn test_framerate() {
        assert_eq!(Framerate::FPS_30.as_f64(), 30.0);
        assert_eq!(Framerate::new(30000, 1001).to_string(), "29.970");
    }
}
