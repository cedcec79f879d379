//! Stream backends
//!
//! A backend owns one open file and moves packed frames between it and
//! [`Frame`] buffers. Backends are picked by file extension: each one
//! registers the extensions it reads and writes, the first registered match
//! wins, and unclaimed extensions fall back to raw video.

pub mod image;
#[cfg(feature = "libav")]
pub mod libav;
pub mod portable_map;
pub mod raw;

use crate::error::Result;
use crate::format::PixelFormat;
use crate::frame::Frame;
use crate::types::{Direction, Endianness, Framerate};

use std::io::Read;
use std::path::Path;

pub use self::image::ImageBackend;
#[cfg(feature = "libav")]
pub use libav::LibavBackend;
pub use portable_map::PortableMapBackend;
pub use raw::RawBackend;

/// Stream properties shared between a backend and its stream.
///
/// The stream fills in the requested geometry before opening; backends that
/// read geometry from a file header overwrite it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bits_per_sample: u32,
    pub endianness: Endianness,
    pub frame_rate: Framerate,
    /// Index of the next frame the backend will read
    pub curr_frame_idx: u64,
    pub total_frames: u64,
    pub bytes_per_frame: u64,
    /// False when the backend converts from a foreign sample layout
    pub native: bool,
    pub format_name: String,
    pub codec_name: String,
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: PixelFormat::Yuv420p,
            bits_per_sample: 8,
            endianness: Endianness::Little,
            frame_rate: Framerate::default(),
            curr_frame_idx: 0,
            total_frames: 0,
            bytes_per_frame: 0,
            native: true,
            format_name: String::new(),
            codec_name: String::new(),
        }
    }
}

/// Trait for stream backends
pub trait Backend: Send {
    /// Backend display name
    fn name(&self) -> &'static str;

    fn info(&self) -> &StreamInfo;

    fn info_mut(&mut self) -> &mut StreamInfo;

    /// Open `path` for reading or writing
    fn open(&mut self, path: &Path, direction: Direction) -> Result<()>;

    /// Release the file
    fn close(&mut self);

    /// Size internal buffers for frames shaped like `template`
    fn configure_buffer(&mut self, template: &Frame) -> Result<()>;

    /// Derive the frame count once `bytes_per_frame` is known
    fn calculate_frame_count(&mut self) -> Result<()> {
        Ok(())
    }

    /// Position the backend so the next read returns frame `frame_num`
    fn seek(&mut self, frame_num: u64) -> Result<()>;

    /// Decode the next frame into `frame`
    fn read(&mut self, frame: &mut Frame) -> Result<()>;

    /// Encode `frame` into the stream
    fn write(&mut self, frame: &Frame) -> Result<()>;
}

/// Available backend implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Raw,
    PortableMap,
    Image,
    #[cfg(feature = "libav")]
    Libav,
}

impl BackendKind {
    /// Create a fresh backend instance
    pub fn create(self) -> Box<dyn Backend> {
        match self {
            BackendKind::Raw => Box::new(RawBackend::new()),
            BackendKind::PortableMap => Box::new(PortableMapBackend::new()),
            BackendKind::Image => Box::new(ImageBackend::new()),
            #[cfg(feature = "libav")]
            BackendKind::Libav => Box::new(LibavBackend::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Raw => "RawVideo",
            BackendKind::PortableMap => "PortableMap",
            BackendKind::Image => "Image",
            #[cfg(feature = "libav")]
            BackendKind::Libav => "Libav",
        }
    }
}

/// One registered container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub backend: BackendKind,
}

impl StreamFormat {
    const fn new(name: &'static str, extensions: &'static [&'static str], backend: BackendKind) -> Self {
        Self {
            name,
            extensions,
            backend,
        }
    }
}

const RAW_FORMATS: &[StreamFormat] = &[
    StreamFormat::new("Raw YUV Video", &["yuv"], BackendKind::Raw),
    StreamFormat::new("Raw Gray Video", &["gray"], BackendKind::Raw),
    StreamFormat::new("Raw RGB Video", &["rgb"], BackendKind::Raw),
    StreamFormat::new("Raw Video", &["raw"], BackendKind::Raw),
];

const PORTABLE_MAP_FORMATS: &[StreamFormat] = &[
    StreamFormat::new("Portable BitMap", &["pbm"], BackendKind::PortableMap),
    StreamFormat::new("Portable GrayMap", &["pgm"], BackendKind::PortableMap),
    StreamFormat::new("Portable PixMap", &["ppm"], BackendKind::PortableMap),
];

const IMAGE_FORMATS: &[StreamFormat] = &[
    StreamFormat::new("Portable Network Graphics", &["png"], BackendKind::Image),
    StreamFormat::new("Joint Photographic Experts Group", &["jpg", "jpeg"], BackendKind::Image),
    StreamFormat::new("Windows Bitmap", &["bmp"], BackendKind::Image),
];

#[cfg(feature = "libav")]
const LIBAV_FORMATS: &[StreamFormat] = &[
    StreamFormat::new("Audio Video Interleaved", &["avi"], BackendKind::Libav),
    StreamFormat::new("MPEG-4 Part 14", &["mp4"], BackendKind::Libav),
    StreamFormat::new("Matroska", &["mkv"], BackendKind::Libav),
    StreamFormat::new("H.264 Elementary Stream", &["264", "h264"], BackendKind::Libav),
    StreamFormat::new("HEVC Elementary Stream", &["265", "hevc"], BackendKind::Libav),
];

/// Formats that can be opened for reading, in lookup order
pub fn supported_read_formats() -> Vec<StreamFormat> {
    let mut formats = Vec::new();
    formats.extend_from_slice(RAW_FORMATS);
    formats.extend_from_slice(PORTABLE_MAP_FORMATS);
    formats.extend_from_slice(IMAGE_FORMATS);
    #[cfg(feature = "libav")]
    formats.extend_from_slice(LIBAV_FORMATS);
    formats
}

/// Formats that can be opened for writing, in lookup order
pub fn supported_write_formats() -> Vec<StreamFormat> {
    let mut formats = Vec::new();
    formats.extend_from_slice(RAW_FORMATS);
    formats.extend_from_slice(PORTABLE_MAP_FORMATS);
    formats.extend_from_slice(IMAGE_FORMATS);
    formats
}

/// Lowercased file extension, empty if there is none
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Pick the backend for `path`
pub fn find_backend(path: &Path, direction: Direction) -> BackendKind {
    let ext = file_extension(path);
    let formats = match direction {
        Direction::Input => supported_read_formats(),
        Direction::Output => supported_write_formats(),
    };

    if !ext.is_empty() {
        if let Some(format) = formats
            .iter()
            .find(|f| f.extensions.iter().any(|e| *e == ext))
        {
            tracing::debug!("{} handled by {} ({})", path.display(), format.backend.name(), format.name);
            return format.backend;
        }
    }

    #[cfg(feature = "libav")]
    if direction.is_input() {
        tracing::debug!("No backend claims '{}', trying libav", ext);
        return BackendKind::Libav;
    }

    tracing::debug!("No backend claims '{}', treating as raw video", ext);
    BackendKind::Raw
}

/// Read until `buf` is full or the reader is exhausted; returns bytes read
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_backend_by_extension() {
        assert_eq!(find_backend(Path::new("a.yuv"), Direction::Input), BackendKind::Raw);
        assert_eq!(find_backend(Path::new("a.PGM"), Direction::Input), BackendKind::PortableMap);
        assert_eq!(find_backend(Path::new("a.ppm"), Direction::Output), BackendKind::PortableMap);
        assert_eq!(find_backend(Path::new("shot.jpeg"), Direction::Output), BackendKind::Image);
        assert_eq!(find_backend(Path::new("a.png"), Direction::Input), BackendKind::Image);
    }

    #[cfg(not(feature = "libav"))]
    #[test]
    fn test_unknown_extension_falls_back_to_raw() {
        assert_eq!(find_backend(Path::new("video.bin"), Direction::Input), BackendKind::Raw);
        assert_eq!(find_backend(Path::new("noext"), Direction::Output), BackendKind::Raw);
    }

    #[test]
    fn test_format_lists() {
        let read = supported_read_formats();
        assert_eq!(read[0].backend, BackendKind::Raw);
        assert!(read.iter().any(|f| f.extensions.contains(&"pgm")));
        let write = supported_write_formats();
        assert!(write.iter().any(|f| f.extensions.contains(&"bmp")));
    }

    #[test]
    fn test_read_full_stops_at_eof() {
        let mut src: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 5];
        assert_eq!(read_full(&mut src, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }
}
