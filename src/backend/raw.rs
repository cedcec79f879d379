//! Headerless raw video files
//!
//! Geometry comes from the caller; the file is a plain concatenation of
//! packed frames.

use super::{file_extension, read_full, Backend, StreamInfo};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::types::Direction;

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Raw video backend
pub struct RawBackend {
    info: StreamInfo,
    file: Option<File>,
    direction: Direction,
    buffer: Vec<u8>,
}

impl RawBackend {
    pub fn new() -> Self {
        Self {
            info: StreamInfo::default(),
            file: None,
            direction: Direction::Input,
            buffer: Vec::new(),
        }
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::NotOpen)
    }
}

impl Default for RawBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RawBackend {
    fn name(&self) -> &'static str {
        "RawVideo"
    }

    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut StreamInfo {
        &mut self.info
    }

    fn open(&mut self, path: &Path, direction: Direction) -> Result<()> {
        let file = match direction {
            Direction::Input => File::open(path),
            Direction::Output => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path),
        }
        .map_err(|e| Error::OpenFailure(format!("{}: {}", path.display(), e)))?;

        self.file = Some(file);
        self.direction = direction;
        self.info.curr_frame_idx = 0;
        self.info.format_name = file_extension(path).to_ascii_uppercase();
        self.info.codec_name = "Raw Video".into();
        self.calculate_frame_count()
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                tracing::warn!("Failed to flush raw stream: {}", e);
            }
        }
    }

    fn configure_buffer(&mut self, template: &Frame) -> Result<()> {
        self.buffer.resize(template.bytes_per_frame() as usize, 0);
        Ok(())
    }

    fn calculate_frame_count(&mut self) -> Result<()> {
        let bytes_per_frame = self.info.bytes_per_frame;
        if bytes_per_frame == 0 || self.file.is_none() {
            return Ok(());
        }
        let size = self.file()?.metadata()?.len();
        self.info.total_frames = size / bytes_per_frame;
        Ok(())
    }

    fn seek(&mut self, frame_num: u64) -> Result<()> {
        if !self.direction.is_input() {
            return Err(Error::Unsupported("seek on an output raw stream".into()));
        }
        let offset = frame_num * self.info.bytes_per_frame;
        self.file()?.seek(SeekFrom::Start(offset))?;
        self.info.curr_frame_idx = frame_num;
        Ok(())
    }

    fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let expected = self.info.bytes_per_frame as usize;
        if expected == 0 || self.buffer.len() < expected {
            return Err(Error::Configuration("raw stream buffer not configured".into()));
        }
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        let actual = read_full(file, &mut self.buffer[..expected])?;
        if actual != expected {
            // Back to the frame boundary so the next attempt rereads the frame
            file.seek(SeekFrom::Start(self.info.curr_frame_idx * self.info.bytes_per_frame))?;
            return Err(Error::ShortRead { expected, actual });
        }
        self.info.curr_frame_idx += 1;
        frame.from_bytes(&self.buffer[..expected], self.info.endianness)
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        frame.to_bytes_into(&mut self.buffer, self.info.endianness);
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        file.write_all(&self.buffer)
            .map_err(|e| Error::ShortWrite(e.to_string()))?;
        self.info.curr_frame_idx += 1;
        Ok(())
    }
}

impl Drop for RawBackend {
    fn drop(&mut self) {
        self.close();
    }
}
