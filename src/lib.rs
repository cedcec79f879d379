//! GhostYUV: raw video frame engine
//!
//! Pixel-format aware frames and the streams that feed them, for inspecting
//! and measuring uncompressed video.
//!
//! # Features
//!
//! - **Frames**: planar/interleaved YUV, RGB and gray formats up to 16 bits,
//!   byte packing, crops, region copies, histograms and quality metrics
//! - **Streams**: raw video, portable maps, PNG/JPEG/BMP and (with the `libav`
//!   feature) compressed video, with a read-ahead ring and background reader
//!
//! # Example
//!
//! ```rust,no_run
//! use ghostyuv::{Direction, PixelFormat, QualityMetric, Stream, StreamConfig};
//!
//! fn main() -> ghostyuv::Result<()> {
//!     let config = StreamConfig::default()
//!         .with_resolution(352, 288)
//!         .with_format(PixelFormat::Yuv420p);
//!
//!     let reference = Stream::new();
//!     reference.open("foreman.yuv", &config, Direction::Input)?;
//!     let decoded = Stream::new();
//!     decoded.open("foreman_rec.yuv", &config, Direction::Input)?;
//!
//!     if let (Some(a), Some(b)) = (decoded.current_frame(), reference.current_frame()) {
//!         println!("Y-PSNR: {:.3} dB", a.quality(QualityMetric::Psnr, &b, 0));
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod pixel;
pub mod stream;
pub mod types;

// Re-exports for convenience
pub use backend::{supported_read_formats, supported_write_formats, Backend, BackendKind, StreamFormat, StreamInfo};
pub use config::StreamConfig;
pub use error::{Error, Result};
pub use format::{ColorSpace, PixelFormat, PixelFormatDescriptor};
pub use frame::{FormatMatch, Frame, Histogram, HistogramChannel, QualityMetric, QUALITY_METRICS};
pub use pixel::PixelValue;
pub use stream::{FrameRing, Stream, StreamState, StreamWorker};
pub use types::{Direction, Endianness, Framerate, Resolution};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Whether compressed video decoding was compiled in
pub fn has_libav() -> bool {
    cfg!(feature = "libav")
}
