//! Pixel format registry
//!
//! Static, immutable description of every supported pixel layout: color
//! space, channel count, chroma subsampling and the byte-packing plan used
//! to marshal samples to and from files.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of channels any format can carry
pub const MAX_CHANNELS: usize = 4;

/// Color space of a pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColorSpace {
    #[default]
    Yuv,
    Rgb,
    Gray,
    Rgba,
}

impl ColorSpace {
    pub fn name(&self) -> &'static str {
        match self {
            ColorSpace::Yuv => "YUV",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Gray => "GRAY",
            ColorSpace::Rgba => "ARGB",
        }
    }

    /// Number of channels a pixel in this color space carries
    pub fn channels(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Yuv | ColorSpace::Rgb => 3,
            ColorSpace::Rgba => 4,
        }
    }
}

impl std::fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Supported pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0
    #[default]
    Yuv420p,
    /// Planar YUV 4:2:2
    Yuv422p,
    /// Planar YUV 4:4:4
    Yuv444p,
    /// Interleaved YUV 4:2:2 (Y0 U Y1 V)
    Yuyv422,
    /// Single luma plane
    Gray,
    /// Planar RGB
    Rgbp,
    /// Interleaved RGB
    Rgb,
    /// Interleaved BGR
    Bgr,
    /// Interleaved RGBA
    Rgba,
    /// Interleaved BGRA
    Bgra,
}

impl PixelFormat {
    /// All formats in registry order
    pub const ALL: [PixelFormat; 10] = [
        PixelFormat::Yuv420p,
        PixelFormat::Yuv422p,
        PixelFormat::Yuv444p,
        PixelFormat::Yuyv422,
        PixelFormat::Gray,
        PixelFormat::Rgbp,
        PixelFormat::Rgb,
        PixelFormat::Bgr,
        PixelFormat::Rgba,
        PixelFormat::Bgra,
    ];

    /// Registry entry for this format
    pub fn descriptor(&self) -> &'static PixelFormatDescriptor {
        &REGISTRY[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn color_space(&self) -> ColorSpace {
        self.descriptor().color_space
    }

    /// Look up a format by its name, ignoring case
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| Error::UnknownFormat(name.to_string()))
    }

    /// Look up a format by its numeric id (registry index)
    pub fn from_id(id: usize) -> Result<Self> {
        Self::ALL
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownFormat(format!("id {}", id)))
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Where a channel's samples live in the packed byte layout.
///
/// Offsets and steps are in samples, scaled by the bytes per sample at
/// marshalling time. `offset_plus1` is 1-based so a zeroed entry is never a
/// valid layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub plane: u8,
    pub step_minus1: u8,
    pub offset_plus1: u8,
}

impl ChannelLayout {
    const fn new(plane: u8, step_minus1: u8, offset_plus1: u8) -> Self {
        Self {
            plane,
            step_minus1,
            offset_plus1,
        }
    }

    /// Distance, in samples, between two consecutive samples of this channel
    pub fn step(&self) -> usize {
        self.step_minus1 as usize + 1
    }

    /// Index, in samples, of the first sample of this channel inside its plane
    pub fn offset(&self) -> usize {
        self.offset_plus1 as usize - 1
    }
}

const UNUSED: ChannelLayout = ChannelLayout::new(0, 0, 0);

/// Immutable description of one pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormatDescriptor {
    pub name: &'static str,
    pub color_space: ColorSpace,
    pub channels: usize,
    pub planes: usize,
    pub log2_chroma_width: u32,
    pub log2_chroma_height: u32,
    pub comp: [ChannelLayout; MAX_CHANNELS],
}

impl PixelFormatDescriptor {
    /// Width of a channel's sample grid
    pub fn channel_width(&self, channel: usize, width: u32) -> u32 {
        if channel == 0 {
            width
        } else {
            chroma_shift(width, self.log2_chroma_width)
        }
    }

    /// Height of a channel's sample grid
    pub fn channel_height(&self, channel: usize, height: u32) -> u32 {
        if channel == 0 {
            height
        } else {
            chroma_shift(height, self.log2_chroma_height)
        }
    }

    pub fn has_chroma_subsampling(&self) -> bool {
        self.log2_chroma_width > 0 || self.log2_chroma_height > 0
    }

    /// Whether frames `width` samples wide can be packed.
    ///
    /// Interleaved subsampled layouts store whole chroma groups, so their
    /// width must be a multiple of the horizontal chroma ratio.
    pub fn supports_width(&self, width: u32) -> bool {
        self.planes == self.channels || width % (1 << self.log2_chroma_width) == 0
    }

    /// Channel layouts actually used by this format
    pub fn layouts(&self) -> &[ChannelLayout] {
        &self.comp[..self.channels]
    }
}

/// Ceiling division of `size` by `2^shift`
pub fn chroma_shift(size: u32, shift: u32) -> u32 {
    size.div_ceil(1 << shift)
}

/// Bytes needed to store one sample at the given bit depth
pub fn bytes_per_sample(bits: u32) -> usize {
    ((bits.max(1) - 1) / 8 + 1) as usize
}

/// Packed size in bytes of one frame
pub fn bytes_per_frame(width: u32, height: u32, format: PixelFormat, bits: u32) -> u64 {
    let desc = format.descriptor();
    let luma = width as u64 * height as u64;
    let chroma = if desc.channels > 1 {
        (desc.channels as u64 - 1)
            * chroma_shift(width, desc.log2_chroma_width) as u64
            * chroma_shift(height, desc.log2_chroma_height) as u64
    } else {
        0
    };
    bytes_per_sample(bits) as u64 * (luma + chroma)
}

/// Describe a format by numeric id
pub fn describe(id: usize) -> Result<&'static PixelFormatDescriptor> {
    PixelFormat::from_id(id).map(|f| f.descriptor())
}

/// Names of every registered format, in registry order
pub fn format_names() -> Vec<&'static str> {
    REGISTRY.iter().map(|d| d.name).collect()
}

const fn planar(
    name: &'static str,
    color_space: ColorSpace,
    log2_chroma_width: u32,
    log2_chroma_height: u32,
) -> PixelFormatDescriptor {
    PixelFormatDescriptor {
        name,
        color_space,
        channels: 3,
        planes: 3,
        log2_chroma_width,
        log2_chroma_height,
        comp: [
            ChannelLayout::new(0, 0, 1),
            ChannelLayout::new(1, 0, 1),
            ChannelLayout::new(2, 0, 1),
            UNUSED,
        ],
    }
}

const fn interleaved(
    name: &'static str,
    color_space: ColorSpace,
    channels: usize,
    comp: [ChannelLayout; MAX_CHANNELS],
) -> PixelFormatDescriptor {
    PixelFormatDescriptor {
        name,
        color_space,
        channels,
        planes: 1,
        log2_chroma_width: 0,
        log2_chroma_height: 0,
        comp,
    }
}

// Indexed by `PixelFormat as usize`
static REGISTRY: [PixelFormatDescriptor; 10] = [
    planar("YUV420p", ColorSpace::Yuv, 1, 1),
    planar("YUV422p", ColorSpace::Yuv, 1, 0),
    planar("YUV444p", ColorSpace::Yuv, 0, 0),
    PixelFormatDescriptor {
        name: "YUYV422",
        color_space: ColorSpace::Yuv,
        channels: 3,
        planes: 1,
        log2_chroma_width: 1,
        log2_chroma_height: 0,
        comp: [
            ChannelLayout::new(0, 1, 1),
            ChannelLayout::new(0, 3, 2),
            ChannelLayout::new(0, 3, 4),
            UNUSED,
        ],
    },
    PixelFormatDescriptor {
        name: "GRAY",
        color_space: ColorSpace::Gray,
        channels: 1,
        planes: 1,
        log2_chroma_width: 0,
        log2_chroma_height: 0,
        comp: [ChannelLayout::new(0, 0, 1), UNUSED, UNUSED, UNUSED],
    },
    planar("RGBp", ColorSpace::Rgb, 0, 0),
    interleaved(
        "RGB",
        ColorSpace::Rgb,
        3,
        [
            ChannelLayout::new(0, 2, 1),
            ChannelLayout::new(0, 2, 2),
            ChannelLayout::new(0, 2, 3),
            UNUSED,
        ],
    ),
    interleaved(
        "BGR",
        ColorSpace::Rgb,
        3,
        [
            ChannelLayout::new(0, 2, 3),
            ChannelLayout::new(0, 2, 2),
            ChannelLayout::new(0, 2, 1),
            UNUSED,
        ],
    ),
    interleaved(
        "RGBA",
        ColorSpace::Rgba,
        4,
        [
            ChannelLayout::new(0, 3, 1),
            ChannelLayout::new(0, 3, 2),
            ChannelLayout::new(0, 3, 3),
            ChannelLayout::new(0, 3, 4),
        ],
    ),
    interleaved(
        "BGRA",
        ColorSpace::Rgba,
        4,
        [
            ChannelLayout::new(0, 3, 3),
            ChannelLayout::new(0, 3, 2),
            ChannelLayout::new(0, 3, 1),
            ChannelLayout::new(0, 3, 4),
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_enum() {
        for (i, fmt) in PixelFormat::ALL.iter().enumerate() {
            assert_eq!(*fmt as usize, i);
            assert_eq!(PixelFormat::from_id(i).unwrap(), *fmt);
            assert!(fmt.descriptor().channels >= fmt.descriptor().planes);
        }
        assert!(PixelFormat::from_id(10).is_err());
        assert!(describe(42).is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(PixelFormat::from_name("yuv420p").unwrap(), PixelFormat::Yuv420p);
        assert_eq!(PixelFormat::from_name("gray").unwrap(), PixelFormat::Gray);
        assert_eq!("BGRA".parse::<PixelFormat>().unwrap(), PixelFormat::Bgra);
        assert!(matches!(
            PixelFormat::from_name("nv12"),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_bytes_per_frame() {
        assert_eq!(bytes_per_frame(352, 288, PixelFormat::Yuv420p, 8), 152_064);
        assert_eq!(bytes_per_frame(352, 288, PixelFormat::Yuv420p, 10), 304_128);
        assert_eq!(bytes_per_frame(4, 4, PixelFormat::Gray, 8), 16);
        assert_eq!(bytes_per_frame(4, 2, PixelFormat::Yuyv422, 8), 16);
        assert_eq!(bytes_per_frame(2, 2, PixelFormat::Rgba, 8), 16);
        // Odd sizes round the chroma grid up
        assert_eq!(bytes_per_frame(3, 3, PixelFormat::Yuv420p, 8), 9 + 2 * 4);
    }

    #[test]
    fn test_chroma_shift() {
        assert_eq!(chroma_shift(5, 1), 3);
        assert_eq!(chroma_shift(4, 1), 2);
        assert_eq!(chroma_shift(7, 0), 7);
        let desc = PixelFormat::Yuv422p.descriptor();
        assert_eq!(desc.channel_width(1, 5), 3);
        assert_eq!(desc.channel_height(1, 5), 5);
        assert_eq!(desc.channel_width(0, 5), 5);
    }

    #[test]
    fn test_color_space_names() {
        assert_eq!(ColorSpace::Rgba.name(), "ARGB");
        assert_eq!(PixelFormat::Bgr.color_space(), ColorSpace::Rgb);
        assert_eq!(format_names().len(), 10);
    }
}
