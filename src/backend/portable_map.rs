//! Netpbm still images (PBM, PGM, PPM)
//!
//! Each file holds a single frame. Binary payloads (P4, P5, P6) and their
//! ASCII counterparts (P1, P2, P3) are read; gray maps are written as P5,
//! pixmaps as P6 and 1-bit images as P1. Multi-byte samples are big endian.

use super::{file_extension, Backend, StreamInfo};
use crate::error::{Error, Result};
use crate::format::{bytes_per_sample, ColorSpace, PixelFormat};
use crate::frame::Frame;
use crate::types::{Direction, Endianness, Framerate};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Parsed `P<magic> W H [maxval]` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    magic: u8,
    width: u32,
    height: u32,
    max_value: u32,
}

impl Header {
    fn is_bitmap(&self) -> bool {
        matches!(self.magic, 1 | 4)
    }

    fn is_ascii(&self) -> bool {
        self.magic <= 3
    }

    fn format(&self) -> PixelFormat {
        match self.magic {
            1 | 2 | 4 | 5 => PixelFormat::Gray,
            _ => PixelFormat::Rgb,
        }
    }

    fn bits(&self) -> u32 {
        (32 - self.max_value.leading_zeros()).max(1)
    }

    /// Fewest payload bytes that can hold the whole image
    fn min_payload(&self) -> u64 {
        let channels = self.format().descriptor().channels as u64;
        let samples = u64::from(self.width) * u64::from(self.height) * channels;
        match self.magic {
            4 => u64::from(self.width).div_ceil(8) * u64::from(self.height),
            5 | 6 => samples * bytes_per_sample(self.bits()) as u64,
            // ASCII maps spend at least one character per sample
            _ => samples,
        }
    }
}

/// Whitespace-separated header reader that skips `#` comments
struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn skip_blank(&mut self) {
        while let Some(&c) = self.data.get(self.pos) {
            if c == b'#' {
                while self.data.get(self.pos).is_some_and(|&c| c != b'\n') {
                    self.pos += 1;
                }
            } else if c.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Option<&'a [u8]> {
        self.skip_blank();
        let start = self.pos;
        while self
            .data
            .get(self.pos)
            .is_some_and(|&c| !c.is_ascii_whitespace() && c != b'#')
        {
            self.pos += 1;
        }
        let data = self.data;
        (self.pos > start).then(|| &data[start..self.pos])
    }

    fn next_u32(&mut self, what: &str) -> Result<u32> {
        self.next_token()
            .and_then(|t| std::str::from_utf8(t).ok())
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::OpenFailure(format!("portable map: invalid {}", what)))
    }

    /// Next single `0`/`1` digit of a P1 payload, which may omit separators
    fn next_bit(&mut self) -> Option<u32> {
        self.skip_blank();
        let c = *self.data.get(self.pos)?;
        self.pos += 1;
        match c {
            b'0' => Some(0),
            b'1' => Some(1),
            _ => None,
        }
    }
}

fn parse_header(data: &[u8]) -> Result<(Header, usize)> {
    let mut tokens = Tokens::new(data);
    let magic = match tokens.next_token() {
        Some([b'P', m @ b'1'..=b'6']) => m - b'0',
        _ => return Err(Error::OpenFailure("portable map: bad magic number".into())),
    };
    let width = tokens.next_u32("width")?;
    let height = tokens.next_u32("height")?;
    let max_value = if matches!(magic, 1 | 4) {
        1
    } else {
        tokens.next_u32("maxval")?
    };
    if max_value == 0 || max_value > u16::MAX as u32 {
        return Err(Error::OpenFailure(format!("portable map: maxval {}", max_value)));
    }
    // Exactly one whitespace byte separates the header from the payload
    let payload = (tokens.pos + 1).min(data.len());
    Ok((
        Header {
            magic,
            width,
            height,
            max_value,
        },
        payload,
    ))
}

/// Netpbm backend
pub struct PortableMapBackend {
    info: StreamInfo,
    header: Option<Header>,
    path: PathBuf,
    direction: Direction,
    data: Vec<u8>,
    payload: usize,
}

impl PortableMapBackend {
    pub fn new() -> Self {
        Self {
            info: StreamInfo::default(),
            header: None,
            path: PathBuf::new(),
            direction: Direction::Input,
            data: Vec::new(),
            payload: 0,
        }
    }

    fn open_input(&mut self, path: &Path) -> Result<()> {
        self.data = std::fs::read(path)
            .map_err(|e| Error::OpenFailure(format!("{}: {}", path.display(), e)))?;
        let (header, payload) = parse_header(&self.data)?;
        let available = (self.data.len() - payload) as u64;
        if available < header.min_payload() {
            return Err(Error::OpenFailure(format!(
                "{}: {}x{} image needs {} payload bytes, file holds {}",
                path.display(),
                header.width,
                header.height,
                header.min_payload(),
                available
            )));
        }
        self.payload = payload;
        self.info.width = header.width;
        self.info.height = header.height;
        self.info.format = header.format();
        self.info.bits_per_sample = header.bits();
        self.info.format_name = match header.magic {
            1 | 4 => "PBM",
            2 | 5 => "PGM",
            _ => "PPM",
        }
        .into();
        self.header = Some(header);
        Ok(())
    }

    fn open_output(&mut self, path: &Path) -> Result<()> {
        let bits = self.info.bits_per_sample;
        let (magic, format) = match self.info.format.color_space() {
            _ if bits == 1 => (1, PixelFormat::Gray),
            ColorSpace::Gray => (5, PixelFormat::Gray),
            ColorSpace::Rgb => (6, PixelFormat::Rgb),
            other => {
                return Err(Error::Unsupported(format!(
                    "{} frames in a portable map",
                    other.name()
                )))
            }
        };
        File::create(path).map_err(|e| Error::OpenFailure(format!("{}: {}", path.display(), e)))?;
        self.info.format = format;
        self.info.format_name = file_extension(path).to_ascii_uppercase();
        self.header = Some(Header {
            magic,
            width: self.info.width,
            height: self.info.height,
            max_value: (1u32 << bits) - 1,
        });
        Ok(())
    }

    fn decode_ascii(&self, header: &Header, frame: &mut Frame) -> Result<()> {
        let channels = frame.channels();
        let pixels = header.width as usize * header.height as usize;
        let max = frame.max_value();
        let mut tokens = Tokens::new(&self.data[self.payload..]);
        let mut values = Vec::with_capacity(pixels * channels);

        for _ in 0..pixels * channels {
            let value = if header.is_bitmap() {
                tokens.next_bit().map(|b| 1 - b)
            } else {
                tokens.next_token()
                    .and_then(|t| std::str::from_utf8(t).ok())
                    .and_then(|t| t.parse::<u32>().ok())
            };
            match value {
                Some(v) => values.push(if v > max { 0 } else { v as u16 }),
                None => break,
            }
        }
        if values.len() < pixels * channels {
            return Err(Error::ShortRead {
                expected: pixels * channels,
                actual: values.len(),
            });
        }

        for ch in 0..channels {
            let plane = frame.plane_mut(ch);
            for (i, s) in plane.iter_mut().enumerate() {
                *s = values[i * channels + ch];
            }
        }
        Ok(())
    }

    fn decode_packed_bits(&self, header: &Header, frame: &mut Frame) -> Result<()> {
        let width = header.width as usize;
        let row_bytes = width.div_ceil(8);
        let expected = row_bytes * header.height as usize;
        let payload = &self.data[self.payload..];
        if payload.len() < expected {
            return Err(Error::ShortRead {
                expected,
                actual: payload.len(),
            });
        }
        let plane = frame.plane_mut(0);
        for (y, row) in payload.chunks(row_bytes).take(header.height as usize).enumerate() {
            for x in 0..width {
                let bit = (row[x / 8] >> (7 - x % 8)) & 1;
                plane[y * width + x] = 1 - bit as u16;
            }
        }
        Ok(())
    }

    fn encode(&self, header: &Header, frame: &Frame) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write!(out, "P{}\n{} {}\n", header.magic, header.width, header.height)?;
        if header.is_bitmap() {
            for y in 0..frame.height() {
                let row: Vec<&str> = frame
                    .row(0, y)
                    .iter()
                    .map(|&s| if s == 0 { "1" } else { "0" })
                    .collect();
                writeln!(out, "{}", row.join(" "))?;
            }
        } else {
            writeln!(out, "{}", header.max_value)?;
            out.extend_from_slice(&frame.to_bytes(Endianness::Big));
        }
        Ok(out)
    }
}

impl Default for PortableMapBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for PortableMapBackend {
    fn name(&self) -> &'static str {
        "PortableMap"
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
        match direction {
            Direction::Input => self.open_input(path)?,
            Direction::Output => self.open_output(path)?,
        }
        self.info.endianness = Endianness::Big;
        self.info.frame_rate = Framerate::FPS_1;
        self.info.total_frames = 1;
        self.info.curr_frame_idx = 0;
        self.info.codec_name = "Raw Video".into();
        Ok(())
    }

    fn close(&mut self) {
        self.data = Vec::new();
        self.header = None;
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
        let header = self.header.ok_or(Error::NotOpen)?;
        if !self.direction.is_input() {
            return Err(Error::Unsupported("read from an output portable map".into()));
        }
        if header.is_ascii() {
            self.decode_ascii(&header, frame)?;
        } else if header.is_bitmap() {
            self.decode_packed_bits(&header, frame)?;
        } else {
            frame.from_bytes(&self.data[self.payload..], Endianness::Big)?;
        }
        self.info.curr_frame_idx += 1;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        let header = self.header.ok_or(Error::NotOpen)?;
        let mut target = Frame::new(
            header.width,
            header.height,
            self.info.format,
            frame.bits(),
        )?;
        target.convert_from(frame)?;

        let bytes = self.encode(&header, &target)?;
        let file = File::create(&self.path)
            .map_err(|e| Error::OpenFailure(format!("{}: {}", self.path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::ShortWrite(e.to_string()))?;
        self.info.curr_frame_idx += 1;
        Ok(())
    }
}
