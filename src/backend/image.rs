//! Compressed still images (PNG, JPEG, BMP) via the `image` crate

use super::{file_extension, Backend, StreamInfo};
use crate::error::{Error, Result};
use crate::format::{ColorSpace, PixelFormat};
use crate::frame::Frame;
use crate::types::{Direction, Framerate};

use ::image::{DynamicImage, GrayImage, ImageReader, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};

/// Decoded samples, interleaved
enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl Samples {
    fn get(&self, idx: usize) -> u16 {
        match self {
            Samples::U8(v) => v.get(idx).copied().unwrap_or(0) as u16,
            Samples::U16(v) => v.get(idx).copied().unwrap_or(0),
        }
    }
}

/// Map a decoded image onto a frame format; foreign layouts are converted
fn classify(img: DynamicImage) -> (PixelFormat, u32, bool, Samples) {
    match img {
        DynamicImage::ImageLuma8(i) => (PixelFormat::Gray, 8, true, Samples::U8(i.into_raw())),
        DynamicImage::ImageLuma16(i) => (PixelFormat::Gray, 16, true, Samples::U16(i.into_raw())),
        DynamicImage::ImageRgb8(i) => (PixelFormat::Rgb, 8, true, Samples::U8(i.into_raw())),
        DynamicImage::ImageRgb16(i) => (PixelFormat::Rgb, 16, true, Samples::U16(i.into_raw())),
        DynamicImage::ImageRgba8(i) => (PixelFormat::Rgba, 8, true, Samples::U8(i.into_raw())),
        DynamicImage::ImageRgba16(i) => (PixelFormat::Rgba, 16, true, Samples::U16(i.into_raw())),
        other => (
            PixelFormat::Rgba,
            8,
            false,
            Samples::U8(other.to_rgba8().into_raw()),
        ),
    }
}

/// Still image backend
pub struct ImageBackend {
    info: StreamInfo,
    path: PathBuf,
    direction: Direction,
    decoded: Option<Samples>,
}

impl ImageBackend {
    pub fn new() -> Self {
        Self {
            info: StreamInfo::default(),
            path: PathBuf::new(),
            direction: Direction::Input,
            decoded: None,
        }
    }

    fn encode(&self, frame: &Frame) -> Result<DynamicImage> {
        let argb = frame.fill_rgb_preview();
        let (w, h) = (frame.width(), frame.height());
        let jpeg = matches!(file_extension(&self.path).as_str(), "jpg" | "jpeg");
        let channel = |p: u32, shift: u32| ((p >> shift) & 0xff) as u8;

        let img = match frame.color_space() {
            ColorSpace::Gray => GrayImage::from_raw(w, h, argb.iter().map(|&p| channel(p, 0)).collect())
                .map(DynamicImage::ImageLuma8),
            ColorSpace::Rgba if !jpeg => RgbaImage::from_raw(
                w,
                h,
                argb.iter()
                    .flat_map(|&p| [channel(p, 16), channel(p, 8), channel(p, 0), channel(p, 24)])
                    .collect(),
            )
            .map(DynamicImage::ImageRgba8),
            _ => RgbImage::from_raw(
                w,
                h,
                argb.iter()
                    .flat_map(|&p| [channel(p, 16), channel(p, 8), channel(p, 0)])
                    .collect(),
            )
            .map(DynamicImage::ImageRgb8),
        };
        img.ok_or_else(|| Error::Image(format!("cannot build {}x{} image buffer", w, h)))
    }
}

impl Default for ImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ImageBackend {
    fn name(&self) -> &'static str {
        "Image"
    }

    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut StreamInfo {
        &mut self.info
    }

    fn open(&mut self, path: &Path, direction: Direction) -> Result<()> {
        self.path = path.to_path_buf();
        self.direction = direction;

        if direction.is_input() {
            let img = ImageReader::open(path)
                .map_err(|e| Error::OpenFailure(format!("{}: {}", path.display(), e)))?
                .with_guessed_format()
                .map_err(|e| Error::OpenFailure(format!("{}: {}", path.display(), e)))?
                .decode()?;
            self.info.width = img.width();
            self.info.height = img.height();
            let (format, bits, native, samples) = classify(img);
            self.info.format = format;
            self.info.bits_per_sample = bits;
            self.info.native = native;
            self.decoded = Some(samples);
        }

        self.info.format_name = file_extension(path).to_ascii_uppercase();
        self.info.codec_name = "Image".into();
        self.info.frame_rate = Framerate::FPS_1;
        self.info.total_frames = 1;
        self.info.curr_frame_idx = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.decoded = None;
    }

    fn configure_buffer(&mut self, _template: &Frame) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, frame_num: u64) -> Result<()> {
        if frame_num >= self.info.total_frames {
            return Err(Error::SeekOutOfRange {
                requested: frame_num,
                total: self.info.total_frames,
            });
        }
        self.info.curr_frame_idx = frame_num;
        Ok(())
    }

    fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let samples = self.decoded.as_ref().ok_or(Error::NotOpen)?;
        let channels = frame.channels();
        let max = frame.max_value() as u16;
        for ch in 0..channels {
            for (i, s) in frame.plane_mut(ch).iter_mut().enumerate() {
                *s = samples.get(i * channels + ch).min(max);
            }
        }
        self.info.curr_frame_idx += 1;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.direction.is_input() {
            return Err(Error::Unsupported("write to an input image".into()));
        }
        let img = self.encode(frame)?;
        img.save(&self.path)
            .map_err(|e| Error::ShortWrite(format!("{}: {}", self.path.display(), e)))?;
        self.info.curr_frame_idx += 1;
        Ok(())
    }
}
