//! Frame streams
//!
//! A [`Stream`] couples one backend with a ring of decoded frames. All state
//! sits behind a single mutex so the caller thread and the background reader
//! ([`StreamWorker`]) serialize on every read, write and seek.

mod ring;
mod worker;

pub use ring::FrameRing;
pub use worker::StreamWorker;

use crate::backend::{find_backend, Backend};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::format::{bytes_per_frame, PixelFormat};
use crate::frame::Frame;
use crate::types::{Direction, Endianness, Framerate};

use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Frames kept in flight for an input stream
const INPUT_RING_CAPACITY: usize = 4;

/// Stream lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Closed,
    Opening,
    Ready,
}

struct StreamInner {
    state: StreamState,
    direction: Direction,
    path: PathBuf,
    has_negative_values: bool,
    backend: Option<Box<dyn Backend>>,
    ring: Option<FrameRing>,
    /// Frame exposed to the caller, `None` before the first seek
    curr_frame: Option<u64>,
    loaded_all: bool,
}

impl StreamInner {
    fn new() -> Self {
        Self {
            state: StreamState::Closed,
            direction: Direction::Input,
            path: PathBuf::new(),
            has_negative_values: false,
            backend: None,
            ring: None,
            curr_frame: None,
            loaded_all: false,
        }
    }

    fn backend(&self) -> Result<&dyn Backend> {
        self.backend.as_deref().ok_or(Error::NotOpen)
    }

    fn total_frames(&self) -> u64 {
        self.backend
            .as_ref()
            .map(|b| b.info().total_frames)
            .unwrap_or(0)
    }

    fn require_input(&self) -> Result<()> {
        if self.state != StreamState::Ready {
            return Err(Error::NotOpen);
        }
        if !self.direction.is_input() {
            return Err(Error::Unsupported("operation on an output stream".into()));
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.close();
        }
        self.ring = None;
        self.curr_frame = None;
        self.loaded_all = false;
        self.state = StreamState::Closed;
    }

    fn open(&mut self, path: &Path, config: &StreamConfig, direction: Direction) -> Result<()> {
        self.close();
        self.state = StreamState::Opening;
        self.direction = direction;
        self.path = path.to_path_buf();
        self.has_negative_values = config.has_negative_values;

        let kind = find_backend(path, direction);
        let mut backend = kind.create();
        {
            let info = backend.info_mut();
            info.width = config.width;
            info.height = config.height;
            info.format = config.format;
            info.bits_per_sample = config.bits_per_sample;
            info.endianness = config.endianness;
            info.frame_rate = config.frame_rate;
            info.bytes_per_frame = config.bytes_per_frame();
        }
        backend.open(path, direction)?;

        let template = self.configure(backend.as_mut())?;
        let capacity = if direction.is_input() { INPUT_RING_CAPACITY } else { 1 };
        self.ring = Some(FrameRing::new(&template, capacity));
        self.backend = Some(backend);
        self.state = StreamState::Ready;

        let info = self.backend()?.info();
        tracing::info!(
            "Opened {} {} via {}: {}x{} {} {}-bit, {} frames",
            if direction.is_input() { "input" } else { "output" },
            path.display(),
            kind.name(),
            info.width,
            info.height,
            info.format,
            info.bits_per_sample,
            info.total_frames
        );

        if direction.is_input() {
            self.seek(0)?;
        }
        Ok(())
    }

    /// Validate what the backend reported and size its buffers
    fn configure(&self, backend: &mut dyn Backend) -> Result<Frame> {
        let info = backend.info();
        if info.width == 0 || info.height == 0 {
            return Err(Error::Configuration(format!(
                "unresolved geometry {}x{}",
                info.width, info.height
            )));
        }
        let (width, height, format, bits) = (info.width, info.height, info.format, info.bits_per_sample);

        // Count frames before allocating any buffer
        backend.info_mut().bytes_per_frame = bytes_per_frame(width, height, format, bits);
        backend.calculate_frame_count()?;
        if self.direction.is_input() && backend.info().total_frames == 0 {
            return Err(Error::Configuration(format!(
                "{} holds no complete frame",
                self.path.display()
            )));
        }
        let template = Frame::new(width, height, format, bits)?.with_negative_values(self.has_negative_values);
        backend.configure_buffer(&template)?;
        Ok(template)
    }

    /// Whether the reader has a frame to decode and room to put it
    fn wants_read(&self) -> bool {
        if self.state != StreamState::Ready || self.loaded_all || !self.direction.is_input() {
            return false;
        }
        match (&self.ring, &self.backend) {
            (Some(ring), Some(backend)) => {
                ring.has_writing_slot() && backend.info().curr_frame_idx < backend.info().total_frames
            }
            _ => false,
        }
    }

    /// Decode one frame into the ring; `false` when nothing was read
    fn read_next_frame(&mut self) -> Result<bool> {
        self.require_input()?;
        if !self.wants_read() {
            return Ok(false);
        }
        let (Some(ring), Some(backend)) = (self.ring.as_mut(), self.backend.as_mut()) else {
            return Err(Error::NotOpen);
        };
        let Some(frame) = ring.write_one() else {
            return Ok(false);
        };
        if let Err(e) = backend.read(frame) {
            ring.discard_write();
            return Err(e);
        }
        frame.clear_caches();
        Ok(true)
    }

    /// Decode one frame and render its display preview
    fn read_next_frame_with_preview(&mut self) -> Result<bool> {
        let read = self.read_next_frame()?;
        if read {
            if let Some(frame) = self.ring.as_ref().and_then(|r| r.last_written()) {
                frame.fill_rgb_preview();
            }
        }
        Ok(read)
    }

    fn seek(&mut self, frame_num: u64) -> Result<()> {
        self.require_input()?;
        let total = self.total_frames();
        if frame_num >= total {
            return Err(Error::SeekOutOfRange {
                requested: frame_num,
                total,
            });
        }
        let positioned = self.ring.as_ref().is_some_and(|r| r.current().is_some());
        if positioned && self.curr_frame == Some(frame_num) {
            return Ok(());
        }

        tracing::debug!("Seek {} to frame {}", self.path.display(), frame_num);
        let ring = self.ring.as_mut().ok_or(Error::NotOpen)?;
        if self.loaded_all {
            ring.set_index(frame_num as usize);
            self.curr_frame = Some(frame_num);
            return Ok(());
        }

        // Unpositioned until the target frame is decoded
        ring.reset();
        self.curr_frame = None;
        self.backend.as_mut().ok_or(Error::NotOpen)?.seek(frame_num)?;
        if !self.read_next_frame()? {
            return Err(self.missing_frame());
        }
        if frame_num + 1 < total {
            if let Err(e) = self.read_next_frame() {
                tracing::warn!(
                    "Read ahead of frame {} failed on {}: {}",
                    frame_num + 1,
                    self.path.display(),
                    e
                );
            }
        }
        if let Some(ring) = self.ring.as_mut() {
            ring.start_read();
        }
        self.curr_frame = Some(frame_num);
        Ok(())
    }

    fn missing_frame(&self) -> Error {
        let expected = self.backend().map_or(0, |b| b.info().bytes_per_frame as usize);
        Error::ShortRead { expected, actual: 0 }
    }

    /// Advance to the next frame; `true` at the end of the sequence
    fn set_next_frame(&mut self) -> Result<bool> {
        self.require_input()?;
        let Some(curr) = self.curr_frame else {
            // A failed seek left nothing exposed; start over
            self.seek(0)?;
            return Ok(false);
        };
        let next = curr + 1;
        if next >= self.total_frames() {
            return Ok(true);
        }

        if self.loaded_all {
            if let Some(ring) = self.ring.as_mut() {
                ring.set_index(next as usize);
            }
            self.curr_frame = Some(next);
            return Ok(false);
        }

        self.fill_next_slot()?;
        let ring = self.ring.as_mut().ok_or(Error::NotOpen)?;
        ring.start_read();
        if ring.read_one().is_none() {
            return Err(self.missing_frame());
        }
        self.curr_frame = Some(next);
        Ok(false)
    }

    /// Make sure the frame after the exposed one is decoded
    fn fill_next_slot(&mut self) -> Result<()> {
        let empty = self.ring.as_ref().map_or(true, |r| r.available() == 0);
        if empty && !self.read_next_frame()? {
            return Err(self.missing_frame());
        }
        Ok(())
    }

    fn current_frame(&mut self) -> Option<Arc<Frame>> {
        self.ring.as_mut()?.start_read().cloned()
    }

    fn retrieve_frame(&mut self) -> Result<Option<Arc<Frame>>> {
        self.require_input()?;
        if self.loaded_all {
            let frame = self.current_frame().map(|f| Arc::new(Frame::clone(&f)));
            self.set_next_frame()?;
            return Ok(frame);
        }

        let curr = match self.curr_frame {
            Some(curr) => curr,
            None => {
                self.seek(0)?;
                0
            }
        };
        // Decode the successor first so a failed read leaves the current frame in place
        let has_next = curr + 1 < self.total_frames();
        if has_next {
            self.fill_next_slot()?;
        }

        let Some(ring) = self.ring.as_mut() else {
            return Ok(None);
        };
        ring.start_read();
        let Some(frame) = ring.retrieve_frame() else {
            return Ok(None);
        };
        if has_next {
            self.curr_frame = Some(curr + 1);
        }
        Ok(Some(frame))
    }

    fn load_all(&mut self) -> Result<()> {
        self.require_input()?;
        if self.loaded_all {
            return Ok(());
        }
        let total = self.total_frames();
        let (Some(ring), Some(backend)) = (self.ring.as_mut(), self.backend.as_mut()) else {
            return Err(Error::NotOpen);
        };

        tracing::info!("Loading all {} frames of {}", total, self.path.display());
        ring.increase(total as usize);
        backend.seek(0)?;
        for _ in 0..total {
            let Some(frame) = ring.write_one() else { break };
            if let Err(e) = backend.read(frame) {
                ring.discard_write();
                return Err(e);
            }
            frame.clear_caches();
        }
        ring.set_index(0);
        self.loaded_all = true;
        self.curr_frame = Some(0);
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.state != StreamState::Ready {
            return Err(Error::NotOpen);
        }
        if self.direction.is_input() {
            return Err(Error::Unsupported("write to an input stream".into()));
        }
        let backend = self.backend.as_mut().ok_or(Error::NotOpen)?;
        let info = backend.info();
        if frame.width() != info.width || frame.height() != info.height {
            return Err(Error::IncompatibleFormat(format!(
                "{}x{} frame written to a {}x{} stream",
                frame.width(),
                frame.height(),
                info.width,
                info.height
            )));
        }
        backend.write(frame)?;
        self.curr_frame = Some(self.curr_frame.map_or(0, |c| c + 1));
        Ok(())
    }
}

/// A video file opened for reading or writing
pub struct Stream {
    inner: Mutex<StreamInner>,
    slot_freed: Condvar,
}

impl Stream {
    /// Create a closed stream
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StreamInner::new()),
            slot_freed: Condvar::new(),
        }
    }

    /// Open `path` with the given geometry hints.
    ///
    /// Input streams are positioned on frame 0 when this returns.
    pub fn open(&self, path: impl AsRef<Path>, config: &StreamConfig, direction: Direction) -> Result<()> {
        let path = path.as_ref();
        let mut inner = self.inner.lock();
        let result = inner.open(path, config, direction);
        if let Err(e) = &result {
            tracing::warn!("Cannot open {}: {}", path.display(), e);
            inner.close();
        }
        self.slot_freed.notify_all();
        result
    }

    /// Open with command line style geometry strings
    #[allow(clippy::too_many_arguments)]
    pub fn open_with_strings(
        &self,
        path: impl AsRef<Path>,
        resolution: &str,
        format: &str,
        bits: u32,
        endianness: &str,
        has_negative_values: bool,
        fps: u32,
        direction: Direction,
    ) -> Result<()> {
        let config = StreamConfig::from_strings(resolution, format, bits, endianness, has_negative_values, fps)?;
        self.open(path, &config, direction)
    }

    /// Open `path` again, keeping the current position when it still exists
    pub fn reload(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.require_input()?;
        let path = inner.path.clone();
        let config = Self::config_of(&inner)?;
        let position = inner.curr_frame.unwrap_or(0);

        if let Err(e) = inner.open(&path, &config, Direction::Input) {
            tracing::warn!("Cannot reload {}: {}", path.display(), e);
            inner.close();
            return Err(e);
        }
        let position = if position < inner.total_frames() { position } else { 0 };
        let result = inner.seek(position);
        self.slot_freed.notify_all();
        result
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.state != StreamState::Closed {
            tracing::debug!("Closing {}", inner.path.display());
        }
        inner.close();
        self.slot_freed.notify_all();
    }

    /// Position the stream on frame `frame_num`
    pub fn seek(&self, frame_num: u64) -> Result<()> {
        let result = self.inner.lock().seek(frame_num);
        self.wake();
        result
    }

    /// Step one frame forward or backward
    pub fn seek_relative(&self, forward: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.require_input()?;
        let result = if forward {
            inner.set_next_frame().and_then(|_| inner.read_next_frame().map(|_| ()))
        } else {
            match inner.curr_frame {
                Some(curr) if curr > 0 => inner.seek(curr - 1),
                _ => Ok(()),
            }
        };
        self.slot_freed.notify_all();
        result
    }

    /// Move to the next frame; returns `true` at the end of the sequence
    pub fn set_next_frame(&self) -> Result<bool> {
        let result = self.inner.lock().set_next_frame();
        self.wake();
        result
    }

    /// Decode one frame ahead into the ring; `false` when there was nothing
    /// to read or no free slot
    pub fn read_next_frame(&self) -> Result<bool> {
        self.inner.lock().read_next_frame()
    }

    /// Like [`Stream::read_next_frame`], also filling the new frame's RGB
    /// preview so display code finds it ready
    pub fn read_next_frame_with_preview(&self) -> Result<bool> {
        self.inner.lock().read_next_frame_with_preview()
    }

    /// Shared handle to the frame the stream is positioned on
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.inner.lock().current_frame()
    }

    /// Take ownership of the current frame and move to the next one.
    ///
    /// The returned frame is never shared with the stream's own buffers.
    pub fn retrieve_frame(&self) -> Result<Option<Arc<Frame>>> {
        let result = self.inner.lock().retrieve_frame();
        self.wake();
        result
    }

    /// Read every frame into memory; seeking then only moves cursors
    pub fn load_all(&self) -> Result<()> {
        self.inner.lock().load_all()
    }

    pub fn write_frame(&self, frame: &Frame) -> Result<()> {
        self.inner.lock().write_frame(frame)
    }

    /// Write a single frame to `path`, choosing the backend by extension
    pub fn save_frame(path: impl AsRef<Path>, frame: &Frame) -> Result<()> {
        let config = StreamConfig::default()
            .with_resolution(frame.width(), frame.height())
            .with_format(frame.format())
            .with_bits(frame.bits())
            .with_endianness(Endianness::Little)
            .with_negative_values(frame.has_negative_values())
            .with_fps(1);
        let stream = Stream::new();
        stream.open(path, &config, Direction::Output)?;
        stream.write_frame(frame)?;
        stream.close();
        Ok(())
    }

    /// Signal the background reader that a slot may have been freed
    pub fn wake(&self) {
        let _guard = self.inner.lock();
        self.slot_freed.notify_all();
    }

    /// Spawn a background reader for this stream
    pub fn spawn_reader(self: &Arc<Self>) -> StreamWorker {
        let mut worker = StreamWorker::new(Arc::clone(self));
        worker.start();
        worker
    }

    pub fn state(&self) -> StreamState {
        self.inner.lock().state
    }

    pub fn direction(&self) -> Direction {
        self.inner.lock().direction
    }

    pub fn is_open(&self) -> bool {
        self.state() == StreamState::Ready
    }

    /// Geometry and sample layout the stream resolved to
    pub fn config(&self) -> Result<StreamConfig> {
        Self::config_of(&self.inner.lock())
    }

    fn config_of(inner: &StreamInner) -> Result<StreamConfig> {
        let info = inner.backend()?.info();
        Ok(StreamConfig {
            width: info.width,
            height: info.height,
            format: info.format,
            bits_per_sample: info.bits_per_sample,
            endianness: info.endianness,
            has_negative_values: inner.has_negative_values,
            frame_rate: info.frame_rate,
        })
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.with_info(|i| i.format)
    }

    pub fn width(&self) -> u32 {
        self.with_info(|i| i.width).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.with_info(|i| i.height).unwrap_or(0)
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.with_info(|i| i.bits_per_sample).unwrap_or(0)
    }

    pub fn frame_rate(&self) -> Framerate {
        self.with_info(|i| i.frame_rate).unwrap_or_default()
    }

    pub fn frame_count(&self) -> u64 {
        self.inner.lock().total_frames()
    }

    /// Index of the frame the stream is positioned on
    pub fn curr_frame_num(&self) -> u64 {
        self.inner.lock().curr_frame.unwrap_or(0)
    }

    /// Whether the stream is positioned on its last frame
    pub fn is_eof(&self) -> bool {
        let inner = self.inner.lock();
        inner.curr_frame.map_or(0, |c| c + 1) >= inner.total_frames()
    }

    /// Whether a frame after the current one is already decoded
    pub fn has_next_frame(&self) -> bool {
        let inner = self.inner.lock();
        if inner.loaded_all {
            return inner.curr_frame.map_or(0, |c| c + 1) < inner.total_frames();
        }
        inner.ring.as_ref().is_some_and(|r| r.available() > 0)
    }

    /// False when the backend converts from a foreign sample layout
    pub fn is_native(&self) -> bool {
        self.with_info(|i| i.native).unwrap_or(true)
    }

    pub fn is_loaded_all(&self) -> bool {
        self.inner.lock().loaded_all
    }

    pub fn format_name(&self) -> String {
        self.with_info(|i| i.format_name.clone()).unwrap_or_default()
    }

    pub fn codec_name(&self) -> String {
        self.with_info(|i| i.codec_name.clone()).unwrap_or_default()
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.inner.lock().backend().ok().map(|b| b.name())
    }

    pub fn file_name(&self) -> String {
        self.inner
            .lock()
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn with_info<T>(&self, f: impl FnOnce(&crate::backend::StreamInfo) -> T) -> Option<T> {
        let inner = self.inner.lock();
        inner.backend().ok().map(|b| f(b.info()))
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Stream")
            .field("path", &inner.path)
            .field("state", &inner.state)
            .field("direction", &inner.direction)
            .field("curr_frame", &inner.curr_frame)
            .field("ring", &inner.ring)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelValue;

    /// Raw file of `frames` frames; luma of frame `n` is filled with `n`
    fn raw_clip(dir: &Path, name: &str, config: &StreamConfig, frames: u16) -> PathBuf {
        let path = dir.join(name);
        let template = Frame::new(config.width, config.height, config.format, config.bits_per_sample).unwrap();
        let mut data = Vec::new();
        for n in 0..frames {
            let mut frame = Frame::new_like(&template);
            frame.fill_channel(0, n);
            data.extend(frame.to_bytes(config.endianness));
        }
        std::fs::write(&path, data).unwrap();
        path
    }

    fn gray_config() -> StreamConfig {
        StreamConfig::default()
            .with_resolution(8, 4)
            .with_format(PixelFormat::Gray)
    }

    fn luma(frame: &Frame) -> u16 {
        frame.plane(0)[0]
    }

    #[test]
    fn test_cif_raw_seek_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let config = StreamConfig::default().with_resolution(352, 288);
        let path = raw_clip(dir.path(), "foreman.yuv", &config, 10);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        assert_eq!(stream.frame_count(), 10);
        assert_eq!(stream.format_name(), "YUV");
        assert_eq!(stream.file_name(), "foreman.yuv");
        assert!(stream.seek(9).is_ok());
        assert_eq!(luma(&stream.current_frame().unwrap()), 9);
        assert!(matches!(
            stream.seek(10),
            Err(Error::SeekOutOfRange { requested: 10, total: 10 })
        ));
    }

    #[test]
    fn test_sequential_reading() {
        let dir = tempfile::tempdir().unwrap();
        let config = gray_config();
        let path = raw_clip(dir.path(), "clip.gray", &config, 6);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        assert_eq!(stream.curr_frame_num(), 0);
        assert!(stream.has_next_frame());

        let mut seen = vec![luma(&stream.current_frame().unwrap())];
        while !stream.set_next_frame().unwrap() {
            seen.push(luma(&stream.current_frame().unwrap()));
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert!(stream.is_eof());
        assert_eq!(stream.curr_frame_num(), 5);
    }

    #[test]
    fn test_seek_relative_and_noop_seek() {
        let dir = tempfile::tempdir().unwrap();
        let config = gray_config();
        let path = raw_clip(dir.path(), "clip.gray", &config, 5);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        stream.seek(3).unwrap();
        let held = stream.current_frame().unwrap();
        stream.seek(3).unwrap();
        assert!(Arc::ptr_eq(&held, &stream.current_frame().unwrap()));

        stream.seek_relative(false).unwrap();
        assert_eq!(luma(&stream.current_frame().unwrap()), 2);
        stream.seek_relative(true).unwrap();
        assert_eq!(luma(&stream.current_frame().unwrap()), 3);
        assert_eq!(luma(&held), 3);
    }

    #[test]
    fn test_failed_reads_keep_position() {
        let dir = tempfile::tempdir().unwrap();
        let config = gray_config();
        let path = raw_clip(dir.path(), "clip.gray", &config, 8);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        // Only frames 0 and 1 survive
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(2 * 32)
            .unwrap();

        assert!(!stream.set_next_frame().unwrap());
        assert_eq!(stream.curr_frame_num(), 1);
        for _ in 0..2 {
            assert!(matches!(stream.set_next_frame(), Err(Error::ShortRead { .. })));
            assert_eq!(stream.curr_frame_num(), 1);
            assert_eq!(luma(&stream.current_frame().unwrap()), 1);
        }
        assert!(matches!(stream.retrieve_frame(), Err(Error::ShortRead { .. })));
        assert_eq!(stream.curr_frame_num(), 1);
        assert_eq!(luma(&stream.current_frame().unwrap()), 1);

        // A failed seek leaves the stream unpositioned, not on the target
        assert!(matches!(stream.seek(5), Err(Error::ShortRead { .. })));
        assert!(stream.current_frame().is_none());
        assert_eq!(stream.curr_frame_num(), 0);

        // Frame 1 decodes even though its successor is gone
        stream.seek(1).unwrap();
        assert_eq!(luma(&stream.current_frame().unwrap()), 1);
        assert!(stream.set_next_frame().is_err());
        assert_eq!(stream.curr_frame_num(), 1);

        // Stepping from an unpositioned stream starts over at frame 0
        assert!(stream.seek(6).is_err());
        assert!(!stream.set_next_frame().unwrap());
        assert_eq!(stream.curr_frame_num(), 0);
        assert_eq!(luma(&stream.current_frame().unwrap()), 0);
    }

    #[test]
    fn test_open_rejects_oversized_portable_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pgm");
        let mut data = b"P5\n1000000 1000000\n255\n".to_vec();
        data.extend([0u8; 64]);
        std::fs::write(&path, data).unwrap();

        let stream = Stream::new();
        assert!(stream.open(&path, &StreamConfig::default(), Direction::Input).is_err());
        assert_eq!(stream.state(), StreamState::Closed);

        // Raw geometry larger than the file is refused before allocation
        let raw = dir.path().join("tiny.yuv");
        std::fs::write(&raw, [0u8; 64]).unwrap();
        let config = StreamConfig::default().with_resolution(1_000_000, 1_000_000);
        assert!(matches!(
            stream.open(&raw, &config, Direction::Input),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_retrieve_frame_detaches() {
        let dir = tempfile::tempdir().unwrap();
        let config = gray_config();
        let path = raw_clip(dir.path(), "clip.gray", &config, 3);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        let first = stream.retrieve_frame().unwrap().unwrap();
        assert_eq!(luma(&first), 0);
        assert_eq!(Arc::strong_count(&first), 1);
        assert_eq!(stream.curr_frame_num(), 1);
        assert_eq!(luma(&stream.current_frame().unwrap()), 1);
    }

    #[test]
    fn test_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let config = gray_config();
        let path = raw_clip(dir.path(), "clip.gray", &config, 7);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        stream.load_all().unwrap();
        assert!(stream.is_loaded_all());
        assert!(!stream.read_next_frame().unwrap());

        stream.seek(6).unwrap();
        assert_eq!(luma(&stream.current_frame().unwrap()), 6);
        stream.seek(2).unwrap();
        assert_eq!(luma(&stream.current_frame().unwrap()), 2);
        assert!(!stream.set_next_frame().unwrap());
        assert_eq!(luma(&stream.current_frame().unwrap()), 3);

        let copy = stream.retrieve_frame().unwrap().unwrap();
        assert_eq!(luma(&copy), 3);
        assert_eq!(luma(&stream.current_frame().unwrap()), 4);
        stream.seek(3).unwrap();
        assert_eq!(luma(&stream.current_frame().unwrap()), 3);
    }

    #[test]
    fn test_open_rejects_empty_and_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yuv");
        std::fs::write(&path, b"").unwrap();

        let stream = Stream::new();
        let config = StreamConfig::default().with_resolution(16, 16);
        assert!(matches!(
            stream.open(&path, &config, Direction::Input),
            Err(Error::Configuration(_))
        ));
        assert_eq!(stream.state(), StreamState::Closed);

        std::fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(matches!(
            stream.open(&path, &StreamConfig::default(), Direction::Input),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(stream.seek(0), Err(Error::NotOpen)));
    }

    #[test]
    fn test_pgm_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.pgm");
        let mut data = b"P5\n4 4\n255\n".to_vec();
        data.extend([0x80u8; 16]);
        std::fs::write(&path, data).unwrap();

        let stream = Stream::new();
        stream.open(&path, &StreamConfig::default(), Direction::Input).unwrap();
        assert_eq!(stream.format(), Some(PixelFormat::Gray));
        assert_eq!((stream.width(), stream.height()), (4, 4));
        assert_eq!(stream.frame_count(), 1);
        let frame = stream.current_frame().unwrap();
        assert!(frame.plane(0).iter().all(|&s| s == 128));
        assert!(stream.set_next_frame().unwrap());
    }

    #[test]
    fn test_save_frame_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.ppm");
        let mut frame = Frame::new(3, 2, PixelFormat::Rgb, 8).unwrap();
        frame.set_pixel(1, 1, PixelValue::rgb(1, 2, 3));
        Stream::save_frame(&path, &frame).unwrap();

        let stream = Stream::new();
        stream.open(&path, &StreamConfig::default(), Direction::Input).unwrap();
        assert_eq!(*stream.current_frame().unwrap(), frame);
    }

    #[test]
    fn test_write_frames_to_raw_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yuv");
        let config = StreamConfig::default().with_resolution(4, 4);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Output).unwrap();
        let frame = Frame::new(4, 4, PixelFormat::Yuv420p, 8).unwrap();
        stream.write_frame(&frame).unwrap();
        stream.write_frame(&frame).unwrap();
        assert!(matches!(stream.seek(0), Err(Error::Unsupported(_))));

        let wrong = Frame::new(8, 8, PixelFormat::Yuv420p, 8).unwrap();
        assert!(matches!(stream.write_frame(&wrong), Err(Error::IncompatibleFormat(_))));
        stream.close();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * 24);
    }

    #[test]
    fn test_reload_keeps_position() {
        let dir = tempfile::tempdir().unwrap();
        let config = gray_config();
        let path = raw_clip(dir.path(), "clip.gray", &config, 4);

        let stream = Stream::new();
        stream.open(&path, &config, Direction::Input).unwrap();
        stream.seek(3).unwrap();

        raw_clip(dir.path(), "clip.gray", &config, 8);
        stream.reload().unwrap();
        assert_eq!(stream.frame_count(), 8);
        assert_eq!(stream.curr_frame_num(), 3);

        raw_clip(dir.path(), "clip.gray", &config, 2);
        stream.reload().unwrap();
        assert_eq!(stream.curr_frame_num(), 0);
        assert_eq!(luma(&stream.current_frame().unwrap()), 0);
    }

    #[test]
    fn test_open_with_strings() {
        let dir = tempfile::tempdir().unwrap();
        let config = StreamConfig::default().with_resolution(176, 144);
        let path = raw_clip(dir.path(), "akiyo.yuv", &config, 2);

        let stream = Stream::new();
        stream
            .open_with_strings(&path, "QCIF", "yuv420p", 8, "little", false, 25, Direction::Input)
            .unwrap();
        assert_eq!(stream.frame_count(), 2);
        assert_eq!(stream.frame_rate(), Framerate::FPS_25);
        assert_eq!(stream.codec_name(), "Raw Video");
        assert!(stream.is_native());
    }
}
