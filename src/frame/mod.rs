//! Pixel-format-aware frame buffer
//!
//! A [`Frame`] owns one contiguous sample arena holding every channel at its
//! own (possibly subsampled) resolution. Samples are stored as `u16`, so any
//! bit depth from 1 to 16 bits fits without repacking.
//!
//! Derived data (the ARGB preview and the histogram) is cached next to the
//! samples and dropped whenever the samples change.

mod histogram;
mod packing;
mod preview;
mod quality;

pub use histogram::{Histogram, HistogramChannel};
pub use quality::{QualityMetric, QUALITY_METRICS};

use crate::error::{Error, Result};
use crate::format::{ColorSpace, PixelFormat, PixelFormatDescriptor, MAX_CHANNELS};
use crate::pixel::PixelValue;

use std::ops::BitOr;
use std::sync::OnceLock;

/// Format properties compared by [`Frame::same_format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatMatch(u32);

impl FormatMatch {
    pub const COLOR_SPACE: Self = Self(1);
    pub const RESOLUTION: Self = Self(2);
    pub const PEL_FMT: Self = Self(4);
    pub const BITS: Self = Self(8);
    /// Passes when the receiving frame is gray or both color spaces agree
    pub const COLOR_SPACE_IGNORE_GRAY: Self = Self(16);
    pub const BYTES_PER_FRAME: Self = Self(32);
    pub const ALL: Self = Self(0xFFFF);

    pub fn contains(self, other: FormatMatch) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FormatMatch {
    type Output = FormatMatch;

    fn bitor(self, rhs: FormatMatch) -> FormatMatch {
        FormatMatch(self.0 | rhs.0)
    }
}

/// A video frame in one of the registered pixel formats
#[derive(Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    bits: u32,
    has_negative_values: bool,
    samples: Vec<u16>,
    // Channel c spans samples[offsets[c]..offsets[c + 1]]
    offsets: [usize; MAX_CHANNELS + 1],
    preview: OnceLock<Vec<u32>>,
    histogram: OnceLock<Histogram>,
}

impl Frame {
    /// Allocate a frame; every sample starts at zero
    pub fn new(width: u32, height: u32, format: PixelFormat, bits: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidGeometry(format!(
                "{}x{} frame",
                width, height
            )));
        }
        if bits == 0 || bits > 16 {
            return Err(Error::InvalidGeometry(format!(
                "{} bits per sample",
                bits
            )));
        }

        let desc = format.descriptor();
        if !desc.supports_width(width) {
            return Err(Error::InvalidGeometry(format!(
                "{} frames need a width divisible by {}, got {}",
                format,
                1u32 << desc.log2_chroma_width,
                width
            )));
        }
        let too_large = || Error::Configuration(format!("{}x{} {} frame is too large", width, height, format));
        let mut offsets = [0usize; MAX_CHANNELS + 1];
        for ch in 0..MAX_CHANNELS {
            let len = if ch < desc.channels {
                (desc.channel_width(ch, width) as usize)
                    .checked_mul(desc.channel_height(ch, height) as usize)
                    .ok_or_else(too_large)?
            } else {
                0
            };
            offsets[ch + 1] = offsets[ch].checked_add(len).ok_or_else(too_large)?;
        }

        let mut samples = Vec::new();
        samples.try_reserve_exact(offsets[MAX_CHANNELS]).map_err(|e| {
            Error::Configuration(format!("cannot allocate {}x{} {} frame: {}", width, height, format, e))
        })?;
        samples.resize(offsets[MAX_CHANNELS], 0);

        Ok(Self {
            width,
            height,
            format,
            bits,
            has_negative_values: false,
            samples,
            offsets,
            preview: OnceLock::new(),
            histogram: OnceLock::new(),
        })
    }

    /// Mark samples as signed values stored with a half-range offset
    pub fn with_negative_values(mut self, has_negative_values: bool) -> Self {
        self.has_negative_values = has_negative_values;
        self
    }

    /// Allocate an empty frame with the same geometry as `other`
    pub fn new_like(other: &Frame) -> Self {
        Self {
            width: other.width,
            height: other.height,
            format: other.format,
            bits: other.bits,
            has_negative_values: other.has_negative_values,
            samples: vec![0; other.samples.len()],
            offsets: other.offsets,
            preview: OnceLock::new(),
            histogram: OnceLock::new(),
        }
    }

    /// Crop a region out of `src`.
    ///
    /// For subsampled formats the region is grown outward onto the chroma
    /// grid: an unaligned start moves back by one and an unaligned end grows
    /// the size by one.
    pub fn crop(src: &Frame, x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        let desc = src.descriptor();
        let (mut x, mut y, mut width, mut height) = (x, y, width, height);
        if desc.log2_chroma_width > 0 {
            let grid = 1 << desc.log2_chroma_width;
            if x % grid != 0 {
                x -= 1;
            }
            if (x + width) % grid != 0 {
                width += 1;
            }
        }
        if desc.log2_chroma_height > 0 {
            let grid = 1 << desc.log2_chroma_height;
            if y % grid != 0 {
                y -= 1;
            }
            if (y + height) % grid != 0 {
                height += 1;
            }
        }

        if x >= src.width || y >= src.height {
            return Err(Error::InvalidGeometry(format!(
                "crop origin ({}, {}) outside {}x{} frame",
                x, y, src.width, src.height
            )));
        }

        let mut frame = Frame::new(width, height, src.format, src.bits)?
            .with_negative_values(src.has_negative_values);
        frame.copy_from_region(src, x, y);
        Ok(frame)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn descriptor(&self) -> &'static PixelFormatDescriptor {
        self.format.descriptor()
    }

    pub fn color_space(&self) -> ColorSpace {
        self.descriptor().color_space
    }

    pub fn channels(&self) -> usize {
        self.descriptor().channels
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn has_negative_values(&self) -> bool {
        self.has_negative_values
    }

    /// Largest representable sample value
    pub fn max_value(&self) -> u32 {
        (1u32 << self.bits) - 1
    }

    /// Mid-range sample value, the zero point of signed frames
    pub fn half_value(&self) -> u32 {
        1u32 << (self.bits - 1)
    }

    pub fn channel_width(&self, channel: usize) -> u32 {
        self.descriptor().channel_width(channel, self.width)
    }

    pub fn channel_height(&self, channel: usize) -> u32 {
        self.descriptor().channel_height(channel, self.height)
    }

    /// Number of samples in one channel
    pub fn channel_len(&self, channel: usize) -> usize {
        self.offsets[channel + 1] - self.offsets[channel]
    }

    /// Number of samples across all channels
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    /// Packed size in bytes of this frame
    pub fn bytes_per_frame(&self) -> u64 {
        crate::format::bytes_per_frame(self.width, self.height, self.format, self.bits)
    }

    /// Samples of one channel, row-major at the channel's own resolution
    pub fn plane(&self, channel: usize) -> &[u16] {
        &self.samples[self.offsets[channel]..self.offsets[channel + 1]]
    }

    /// Mutable samples of one channel; drops the cached preview and histogram
    pub fn plane_mut(&mut self, channel: usize) -> &mut [u16] {
        self.clear_caches();
        let range = self.offsets[channel]..self.offsets[channel + 1];
        &mut self.samples[range]
    }

    /// One row of one channel
    pub fn row(&self, channel: usize, y: u32) -> &[u16] {
        let w = self.channel_width(channel) as usize;
        let start = y as usize * w;
        &self.plane(channel)[start..start + w]
    }

    /// Raw sample of `channel` at luma coordinates (x, y)
    pub fn sample(&self, channel: usize, x: u32, y: u32) -> u16 {
        let (cx, cy) = self.channel_coords(channel, x, y);
        let w = self.channel_width(channel) as usize;
        self.plane(channel)[cy as usize * w + cx as usize]
    }

    /// Sample with the half-range offset removed when the frame carries
    /// negative values
    pub fn signed_sample(&self, channel: usize, x: u32, y: u32) -> i32 {
        let value = self.sample(channel, x, y) as i32;
        if self.has_negative_values {
            value - self.half_value() as i32
        } else {
            value
        }
    }

    /// All channels at luma coordinates (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> PixelValue {
        let mut pel = PixelValue::new(self.color_space());
        for ch in 0..self.channels() {
            pel[ch] = self.sample(ch, x, y) as i32;
        }
        pel
    }

    /// Pixel at (x, y) converted to another color space
    pub fn get_pixel_as(&self, x: u32, y: u32, color_space: ColorSpace) -> PixelValue {
        self.get_pixel(x, y).convert_to(color_space)
    }

    /// Store every channel of `pixel` at (x, y); values are clamped to the
    /// sample range
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: PixelValue) {
        let max = self.max_value() as i32;
        for ch in 0..self.channels() {
            let (cx, cy) = self.channel_coords(ch, x, y);
            let w = self.channel_width(ch) as usize;
            let idx = self.offsets[ch] + cy as usize * w + cx as usize;
            self.samples[idx] = pixel[ch].clamp(0, max) as u16;
        }
        self.clear_caches();
    }

    /// Fill every sample with the mid-range value
    pub fn reset(&mut self) {
        let half = self.half_value() as u16;
        self.samples.fill(half);
        self.clear_caches();
    }

    /// Fill every sample of one channel with `value`
    pub fn fill_channel(&mut self, channel: usize, value: u16) {
        let value = value.min(self.max_value() as u16);
        self.plane_mut(channel).fill(value);
    }

    /// Drop the cached preview and histogram
    pub fn clear_caches(&mut self) {
        self.preview.take();
        self.histogram.take();
    }

    /// Compare selected format properties with another frame
    pub fn same_format(&self, other: &Frame, flags: FormatMatch) -> bool {
        if flags.contains(FormatMatch::COLOR_SPACE) && self.color_space() != other.color_space() {
            return false;
        }
        if flags.contains(FormatMatch::RESOLUTION)
            && (self.width != other.width || self.height != other.height)
        {
            return false;
        }
        if flags.contains(FormatMatch::PEL_FMT) && self.format != other.format {
            return false;
        }
        if flags.contains(FormatMatch::BITS) && self.bits != other.bits {
            return false;
        }
        if flags.contains(FormatMatch::COLOR_SPACE_IGNORE_GRAY)
            && self.color_space() != ColorSpace::Gray
            && self.color_space() != other.color_space()
        {
            return false;
        }
        if flags.contains(FormatMatch::BYTES_PER_FRAME)
            && self.bytes_per_frame() != other.bytes_per_frame()
        {
            return false;
        }
        true
    }

    fn require_format(&self, other: &Frame, flags: FormatMatch, op: &str) -> Result<()> {
        if self.same_format(other, flags) {
            Ok(())
        } else {
            Err(Error::IncompatibleFormat(format!(
                "{}: {} {}x{} {}-bit vs {} {}x{} {}-bit",
                op,
                self.format,
                self.width,
                self.height,
                self.bits,
                other.format,
                other.width,
                other.height,
                other.bits
            )))
        }
    }

    /// Copy all samples of `other`; requires the same color space, bit depth
    /// and packed size
    pub fn try_copy_from(&mut self, other: &Frame) -> Result<()> {
        self.require_format(
            other,
            FormatMatch::COLOR_SPACE | FormatMatch::BYTES_PER_FRAME | FormatMatch::BITS,
            "copy",
        )?;
        let n = self.samples.len().min(other.samples.len());
        self.samples[..n].copy_from_slice(&other.samples[..n]);
        self.clear_caches();
        Ok(())
    }

    /// Best-effort [`Frame::try_copy_from`]; a format mismatch leaves the
    /// frame untouched
    pub fn copy_from(&mut self, other: &Frame) {
        if let Err(e) = self.try_copy_from(other) {
            tracing::debug!("Frame copy skipped: {}", e);
        }
    }

    /// Fill this frame with the region of `other` starting at (x, y)
    pub fn try_copy_from_region(&mut self, other: &Frame, x: u32, y: u32) -> Result<()> {
        self.require_format(
            other,
            FormatMatch::COLOR_SPACE | FormatMatch::BITS,
            "copy region",
        )?;
        let desc = self.descriptor();
        for ch in 0..self.channels() {
            let (sx, sy) = other.channel_coords(ch, x, y);
            let src_w = other.channel_width(ch);
            let src_h = other.channel_height(ch);
            let dst_w = self.channel_width(ch);
            let dst_h = desc.channel_height(ch, self.height);
            if sx >= src_w || sy >= src_h {
                continue;
            }
            let len = dst_w.min(src_w - sx) as usize;
            let rows = dst_h.min(src_h - sy);
            for i in 0..rows {
                let src_start = other.offsets[ch] + ((sy + i) * src_w + sx) as usize;
                let dst_start = self.offsets[ch] + (i * dst_w) as usize;
                self.samples[dst_start..dst_start + len]
                    .copy_from_slice(&other.samples[src_start..src_start + len]);
            }
        }
        self.clear_caches();
        Ok(())
    }

    /// Best-effort [`Frame::try_copy_from_region`]
    pub fn copy_from_region(&mut self, other: &Frame, x: u32, y: u32) {
        if let Err(e) = self.try_copy_from_region(other, x, y) {
            tracing::debug!("Frame region copy skipped: {}", e);
        }
    }

    /// Paste all of `other` into this frame with its top-left corner at (x, y)
    pub fn try_copy_to_region(&mut self, other: &Frame, x: u32, y: u32) -> Result<()> {
        self.require_format(
            other,
            FormatMatch::COLOR_SPACE | FormatMatch::PEL_FMT | FormatMatch::BITS,
            "paste region",
        )?;
        for ch in 0..self.channels() {
            let (dx, dy) = self.channel_coords(ch, x, y);
            let dst_w = self.channel_width(ch);
            let dst_h = self.channel_height(ch);
            let src_w = other.channel_width(ch);
            let src_h = other.channel_height(ch);
            if dx >= dst_w || dy >= dst_h {
                continue;
            }
            let len = src_w.min(dst_w - dx) as usize;
            let rows = src_h.min(dst_h - dy);
            for i in 0..rows {
                let src_start = other.offsets[ch] + (i * src_w) as usize;
                let dst_start = self.offsets[ch] + ((dy + i) * dst_w + dx) as usize;
                self.samples[dst_start..dst_start + len]
                    .copy_from_slice(&other.samples[src_start..src_start + len]);
            }
        }
        self.clear_caches();
        Ok(())
    }

    /// Best-effort [`Frame::try_copy_to_region`]
    pub fn copy_to_region(&mut self, other: &Frame, x: u32, y: u32) {
        if let Err(e) = self.try_copy_to_region(other, x, y) {
            tracing::debug!("Frame paste skipped: {}", e);
        }
    }

    /// Fill this frame from `other`, converting color space pixel by pixel
    /// when needed. Both frames must share resolution and bit depth.
    pub fn convert_from(&mut self, other: &Frame) -> Result<()> {
        self.require_format(
            other,
            FormatMatch::RESOLUTION | FormatMatch::BITS,
            "convert",
        )?;
        if self.format == other.format {
            return self.try_copy_from(other);
        }
        let target = self.color_space();
        for y in 0..self.height {
            for x in 0..self.width {
                let pel = other.get_pixel(x, y).convert_to(target);
                self.set_pixel(x, y, pel);
            }
        }
        Ok(())
    }

    fn channel_coords(&self, channel: usize, x: u32, y: u32) -> (u32, u32) {
        if channel == 0 {
            (x, y)
        } else {
            let desc = self.descriptor();
            (x >> desc.log2_chroma_width, y >> desc.log2_chroma_height)
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bits", &self.bits)
            .field("has_negative_values", &self.has_negative_values)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Frame) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.format == other.format
            && self.bits == other.bits
            && self.samples == other.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, format: PixelFormat, bits: u32) -> Frame {
        let mut frame = Frame::new(width, height, format, bits).unwrap();
        let max = frame.max_value() as usize;
        for ch in 0..frame.channels() {
            for (i, s) in frame.plane_mut(ch).iter_mut().enumerate() {
                *s = ((i * 7 + ch * 31) % (max + 1)) as u16;
            }
        }
        frame
    }

    #[test]
    fn test_new_rejects_bad_geometry() {
        assert!(matches!(
            Frame::new(0, 10, PixelFormat::Gray, 8),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            Frame::new(10, 0, PixelFormat::Gray, 8),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            Frame::new(10, 10, PixelFormat::Gray, 17),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(Frame::new(10, 10, PixelFormat::Gray, 16).is_ok());
    }

    #[test]
    fn test_new_rejects_odd_width_yuyv() {
        assert!(matches!(
            Frame::new(5, 2, PixelFormat::Yuyv422, 8),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(Frame::new(6, 2, PixelFormat::Yuyv422, 8).is_ok());
        // Planar 4:2:2 keeps a partial chroma column instead
        let planar = Frame::new(5, 2, PixelFormat::Yuv422p, 8).unwrap();
        assert_eq!(planar.channel_width(1), 3);
    }

    #[test]
    fn test_new_reports_unallocatable_frames() {
        assert!(matches!(
            Frame::new(u32::MAX, u32::MAX, PixelFormat::Gray, 8),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Frame::new(u32::MAX, u32::MAX, PixelFormat::Rgba, 16),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_plane_sizes() {
        let frame = Frame::new(5, 3, PixelFormat::Yuv420p, 8).unwrap();
        assert_eq!(frame.channel_len(0), 15);
        assert_eq!(frame.channel_width(1), 3);
        assert_eq!(frame.channel_height(1), 2);
        assert_eq!(frame.channel_len(1), 6);
        assert_eq!(frame.total_samples(), 15 + 12);
        assert_eq!(frame.bytes_per_frame(), 27);
    }

    #[test]
    fn test_pixel_access_uses_chroma_grid() {
        let mut frame = Frame::new(4, 4, PixelFormat::Yuv422p, 8).unwrap();
        frame.set_pixel(3, 2, PixelValue::yuv(10, 20, 30));
        assert_eq!(frame.get_pixel(3, 2), PixelValue::yuv(10, 20, 30));
        // 4:2:2 halves width only: (2, 2) shares chroma with (3, 2)
        assert_eq!(frame.sample(1, 2, 2), 20);
        assert_eq!(frame.sample(1, 3, 3), 0);
        assert_eq!(frame.sample(0, 2, 2), 0);
    }

    #[test]
    fn test_set_pixel_clamps() {
        let mut frame = Frame::new(2, 2, PixelFormat::Gray, 8).unwrap();
        frame.set_pixel(0, 0, PixelValue::gray(300));
        frame.set_pixel(1, 0, PixelValue::gray(-5));
        assert_eq!(frame.sample(0, 0, 0), 255);
        assert_eq!(frame.sample(0, 1, 0), 0);
    }

    #[test]
    fn test_reset_and_signed_samples() {
        let mut frame = Frame::new(2, 2, PixelFormat::Gray, 10)
            .unwrap()
            .with_negative_values(true);
        frame.reset();
        assert_eq!(frame.sample(0, 1, 1), 512);
        assert_eq!(frame.signed_sample(0, 1, 1), 0);
        frame.set_pixel(0, 0, PixelValue::gray(500));
        assert_eq!(frame.signed_sample(0, 0, 0), -12);
    }

    #[test]
    fn test_same_format_flags() {
        let yuv = Frame::new(8, 8, PixelFormat::Yuv420p, 8).unwrap();
        let yuv444 = Frame::new(8, 8, PixelFormat::Yuv444p, 8).unwrap();
        let gray = Frame::new(8, 8, PixelFormat::Gray, 8).unwrap();

        assert!(yuv.same_format(&yuv444, FormatMatch::COLOR_SPACE | FormatMatch::RESOLUTION));
        assert!(!yuv.same_format(&yuv444, FormatMatch::PEL_FMT));
        assert!(!yuv.same_format(&yuv444, FormatMatch::BYTES_PER_FRAME));
        assert!(gray.same_format(&yuv, FormatMatch::COLOR_SPACE_IGNORE_GRAY));
        assert!(!yuv.same_format(&gray, FormatMatch::COLOR_SPACE_IGNORE_GRAY));
        assert!(yuv.same_format(&yuv, FormatMatch::ALL));
    }

    #[test]
    fn test_copy_from_mismatch_is_noop() {
        let src = gradient(8, 8, PixelFormat::Yuv444p, 8);
        let mut dst = Frame::new(8, 8, PixelFormat::Yuv420p, 8).unwrap();
        dst.copy_from(&src);
        assert!(dst.plane(0).iter().all(|&s| s == 0));
        assert!(matches!(
            dst.try_copy_from(&src),
            Err(Error::IncompatibleFormat(_))
        ));

        let mut same = Frame::new(8, 8, PixelFormat::Yuv444p, 8).unwrap();
        same.try_copy_from(&src).unwrap();
        assert_eq!(same, src);
    }

    #[test]
    fn test_crop_snaps_to_chroma_grid() {
        let src = gradient(16, 16, PixelFormat::Yuv420p, 8);
        let crop = Frame::crop(&src, 3, 5, 4, 4).unwrap();
        // x 3 -> 2, (2 + 4) even so width stays; y 5 -> 4, (4 + 4) even
        assert_eq!((crop.width(), crop.height()), (4, 4));
        assert_eq!(crop.sample(0, 0, 0), src.sample(0, 2, 4));

        let crop = Frame::crop(&src, 2, 2, 5, 3).unwrap();
        assert_eq!((crop.width(), crop.height()), (6, 4));

        let gray = gradient(16, 16, PixelFormat::Gray, 8);
        let crop = Frame::crop(&gray, 3, 5, 5, 3).unwrap();
        assert_eq!((crop.width(), crop.height()), (5, 3));
        assert_eq!(crop.sample(0, 0, 0), gray.sample(0, 3, 5));
    }

    #[test]
    fn test_crop_then_paste_restores_region() {
        for format in [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv422p,
            PixelFormat::Yuv444p,
            PixelFormat::Rgb,
        ] {
            let src = gradient(16, 12, format, 8);
            let crop = Frame::crop(&src, 4, 2, 6, 6).unwrap();

            let mut canvas = Frame::new(16, 12, format, 8).unwrap();
            canvas.try_copy_to_region(&crop, 4, 2).unwrap();
            for ch in 0..src.channels() {
                for y in 2..8 {
                    for x in 4..10 {
                        assert_eq!(
                            canvas.sample(ch, x, y),
                            src.sample(ch, x, y),
                            "{} ch {} at ({}, {})",
                            format,
                            ch,
                            x,
                            y
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_paste_is_clipped_to_frame() {
        let patch = gradient(4, 4, PixelFormat::Gray, 8);
        let mut canvas = Frame::new(6, 6, PixelFormat::Gray, 8).unwrap();
        canvas.try_copy_to_region(&patch, 4, 4).unwrap();
        assert_eq!(canvas.sample(0, 5, 5), patch.sample(0, 1, 1));
    }

    #[test]
    fn test_convert_from_yuv_to_rgb() {
        let mut yuv = Frame::new(4, 4, PixelFormat::Yuv420p, 8).unwrap();
        yuv.reset();
        let mut rgb = Frame::new(4, 4, PixelFormat::Rgb, 8).unwrap();
        rgb.convert_from(&yuv).unwrap();
        assert_eq!(rgb.get_pixel(2, 3), PixelValue::rgb(128, 128, 128));

        let ten_bit = Frame::new(4, 4, PixelFormat::Gray, 10).unwrap();
        assert!(rgb.convert_from(&ten_bit).is_err());
    }

    #[test]
    fn test_mutation_clears_caches() {
        let mut frame = gradient(4, 4, PixelFormat::Gray, 8);
        frame.calc_histogram();
        frame.fill_rgb_preview();
        assert!(frame.histogram().is_some());
        assert!(frame.rgb_preview().is_some());
        frame.set_pixel(0, 0, PixelValue::gray(1));
        assert!(frame.histogram().is_none());
        assert!(frame.rgb_preview().is_none());
    }
}
