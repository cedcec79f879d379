//! Compressed video decoding through FFmpeg
//!
//! Read-only. Decoded pictures in a layout the frame engine understands are
//! copied as-is; anything else is converted to 8-bit YUV 4:2:0 by swscale and
//! the stream is flagged as non-native.

use super::{file_extension, Backend, StreamInfo};
use crate::error::{Error, Result};
use crate::format::{bytes_per_sample, PixelFormat};
use crate::frame::Frame;
use crate::types::{Direction, Endianness, Framerate};

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as SwsContext, Flags as SwsFlags};
use std::path::Path;

/// Map an FFmpeg pixel layout to a frame format and bit depth
fn pixel_to_format(pixel: Pixel) -> Option<(PixelFormat, u32)> {
    Some(match pixel {
        Pixel::YUV420P | Pixel::YUVJ420P => (PixelFormat::Yuv420p, 8),
        Pixel::YUV422P | Pixel::YUVJ422P => (PixelFormat::Yuv422p, 8),
        Pixel::YUV444P | Pixel::YUVJ444P => (PixelFormat::Yuv444p, 8),
        Pixel::YUV420P10LE => (PixelFormat::Yuv420p, 10),
        Pixel::YUV422P10LE => (PixelFormat::Yuv422p, 10),
        Pixel::YUV444P10LE => (PixelFormat::Yuv444p, 10),
        Pixel::YUYV422 => (PixelFormat::Yuyv422, 8),
        Pixel::GRAY8 => (PixelFormat::Gray, 8),
        Pixel::RGB24 => (PixelFormat::Rgb, 8),
        Pixel::BGR24 => (PixelFormat::Bgr, 8),
        Pixel::RGBA => (PixelFormat::Rgba, 8),
        Pixel::BGRA => (PixelFormat::Bgra, 8),
        _ => return None,
    })
}

fn ff_err(context: &str) -> impl Fn(ffmpeg::Error) -> Error + '_ {
    move |e| Error::Ffmpeg(format!("{}: {}", context, e))
}

struct Decoder {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
    time_base: ffmpeg::Rational,
    source_pixel: Pixel,
    eof_sent: bool,
}

/// FFmpeg decoding backend
pub struct LibavBackend {
    info: StreamInfo,
    state: Option<Decoder>,
    /// Picture decoded while seeking, returned by the next read
    pending: Option<ffmpeg::frame::Video>,
    buffer: Vec<u8>,
}

impl LibavBackend {
    pub fn new() -> Self {
        Self {
            info: StreamInfo::default(),
            state: None,
            pending: None,
            buffer: Vec::new(),
        }
    }

    fn state(&mut self) -> Result<&mut Decoder> {
        self.state.as_mut().ok_or(Error::NotOpen)
    }

    /// Decode the next picture of the selected stream
    fn decode_next(&mut self) -> Result<ffmpeg::frame::Video> {
        let state = self.state()?;
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if state.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(decoded);
            }
            if state.eof_sent {
                return Err(Error::ShortRead {
                    expected: 1,
                    actual: 0,
                });
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut state.input) {
                Ok(()) if packet.stream() == state.stream_index => {
                    state
                        .decoder
                        .send_packet(&packet)
                        .map_err(ff_err("send packet"))?;
                }
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => {
                    state.decoder.send_eof().map_err(ff_err("send eof"))?;
                    state.eof_sent = true;
                }
                Err(e) => return Err(Error::Ffmpeg(e.to_string())),
            }
        }
    }

    /// Copy a decoded picture into the packed layout, dropping row padding
    fn pack(&mut self, picture: &ffmpeg::frame::Video) {
        let width = self.info.width as usize;
        let height = self.info.height as usize;
        let desc = self.info.format.descriptor();
        let bpp = bytes_per_sample(self.info.bits_per_sample);

        self.buffer.clear();
        if desc.planes == 1 {
            let row = self.info.bytes_per_frame as usize / height.max(1);
            copy_rows(&mut self.buffer, picture, 0, row, height);
        } else {
            copy_rows(&mut self.buffer, picture, 0, width * bpp, height);
            let cw = desc.channel_width(1, self.info.width) as usize;
            let chh = desc.channel_height(1, self.info.height) as usize;
            for plane in 1..desc.planes {
                copy_rows(&mut self.buffer, picture, plane, cw * bpp, chh);
            }
        }
    }
}

fn copy_rows(out: &mut Vec<u8>, picture: &ffmpeg::frame::Video, plane: usize, row: usize, rows: usize) {
    let data = picture.data(plane);
    let stride = picture.stride(plane);
    for y in 0..rows {
        let start = y * stride;
        match data.get(start..start + row) {
            Some(src) => out.extend_from_slice(src),
            None => out.resize(out.len() + row, 0),
        }
    }
}

impl Default for LibavBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for LibavBackend {
    fn name(&self) -> &'static str {
        "Libav"
    }

    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut StreamInfo {
        &mut self.info
    }

    fn open(&mut self, path: &Path, direction: Direction) -> Result<()> {
        if !direction.is_input() {
            return Err(Error::Unsupported("encoding through libav".into()));
        }
        ffmpeg::init().map_err(ff_err("FFmpeg init failed"))?;

        let input = ffmpeg::format::input(&path)
            .map_err(|e| Error::OpenFailure(format!("{}: {}", path.display(), e)))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| Error::OpenFailure(format!("{}: no video stream", path.display())))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let rate = stream.avg_frame_rate();
        let frames = stream.frames();
        let duration = stream.duration();

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(ff_err("decoder context"))?
            .decoder()
            .video()
            .map_err(ff_err("video decoder"))?;

        let source_pixel = decoder.format();
        let (format, bits, native) = match pixel_to_format(source_pixel).filter(|(f, _)| f.descriptor().supports_width(decoder.width())) {
            Some((format, bits)) => (format, bits, true),
            None => (PixelFormat::Yuv420p, 8, false),
        };

        self.info.width = decoder.width();
        self.info.height = decoder.height();
        self.info.format = format;
        self.info.bits_per_sample = bits;
        self.info.endianness = Endianness::Little;
        self.info.native = native;
        if rate.numerator() > 0 && rate.denominator() > 0 {
            self.info.frame_rate = Framerate::new(rate.numerator() as u32, rate.denominator() as u32);
        }
        self.info.total_frames = if frames > 0 {
            frames as u64
        } else if duration > 0 {
            let seconds = duration as f64 * f64::from(time_base);
            (seconds * self.info.frame_rate.as_f64()).round() as u64
        } else {
            0
        };
        self.info.curr_frame_idx = 0;
        self.info.format_name = file_extension(path).to_ascii_uppercase();
        self.info.codec_name = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "unknown".into());

        tracing::info!(
            "libav: {} {}x{} {:?} -> {} ({} frames)",
            self.info.codec_name,
            self.info.width,
            self.info.height,
            source_pixel,
            format,
            self.info.total_frames
        );

        self.state = Some(Decoder {
            input,
            decoder,
            stream_index,
            time_base,
            source_pixel,
            eof_sent: false,
        });
        Ok(())
    }

    fn close(&mut self) {
        self.pending = None;
        self.state = None;
    }

    fn configure_buffer(&mut self, template: &Frame) -> Result<()> {
        self.buffer.reserve(template.bytes_per_frame() as usize);
        Ok(())
    }

    fn seek(&mut self, frame_num: u64) -> Result<()> {
        let fps = self.info.frame_rate.as_f64();
        let state = self.state()?;
        let seconds = frame_num as f64 / fps;
        let ts = (seconds / f64::from(ffmpeg::rescale::TIME_BASE)) as i64;
        state.input.seek(ts, ..ts).map_err(ff_err("seek"))?;
        state.decoder.flush();
        state.eof_sent = false;
        let target = (seconds / f64::from(state.time_base)) as i64;
        self.pending = None;
        self.info.curr_frame_idx = frame_num;
        if frame_num == 0 {
            return Ok(());
        }

        // Decode forward from the preceding key frame
        loop {
            let picture = self.decode_next()?;
            let pts = picture.timestamp().unwrap_or(i64::MAX);
            if pts.saturating_add(1) >= target {
                self.pending = Some(picture);
                return Ok(());
            }
        }
    }

    fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let picture = match self.pending.take() {
            Some(p) => p,
            None => self.decode_next()?,
        };

        let source_pixel = self.state()?.source_pixel;
        if self.info.native {
            self.pack(&picture);
        } else {
            let mut scaler = SwsContext::get(
                source_pixel,
                self.info.width,
                self.info.height,
                Pixel::YUV420P,
                self.info.width,
                self.info.height,
                SwsFlags::BILINEAR,
            )
            .map_err(ff_err("scaler"))?;
            let mut converted = ffmpeg::frame::Video::new(Pixel::YUV420P, self.info.width, self.info.height);
            scaler.run(&picture, &mut converted).map_err(ff_err("scale"))?;
            self.pack(&converted);
        }

        frame.from_bytes(&self.buffer, Endianness::Little)?;
        self.info.curr_frame_idx += 1;
        Ok(())
    }

    fn write(&mut self, _frame: &Frame) -> Result<()> {
        Err(Error::Unsupported("encoding through libav".into()))
    }
}
