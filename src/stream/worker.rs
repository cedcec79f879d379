//! Background frame reader
//!
//! Keeps an input stream's ring topped up. The thread sleeps on the stream's
//! condition variable whenever the ring is full or the file is exhausted and
//! is woken by [`Stream::wake`] or by [`StreamWorker::stop`]. With
//! [`StreamWorker::with_rgb_preview`] it also renders each frame's display
//! preview off the caller's thread.

use super::Stream;

use parking_lot::MutexGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Read-ahead thread for one [`Stream`]
pub struct StreamWorker {
    stream: Arc<Stream>,
    running: Arc<AtomicBool>,
    fill_preview: bool,
    handle: Option<JoinHandle<()>>,
}

impl StreamWorker {
    pub fn new(stream: Arc<Stream>) -> Self {
        Self {
            stream,
            running: Arc::new(AtomicBool::new(false)),
            fill_preview: false,
            handle: None,
        }
    }

    /// Fill the RGB preview of every frame read ahead
    pub fn with_rgb_preview(mut self, enabled: bool) -> Self {
        self.fill_preview = enabled;
        self
    }

    /// Spawn the reader thread; no-op if it is already running
    pub fn start(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let stream = Arc::clone(&self.stream);
        let running = Arc::clone(&self.running);
        let fill_preview = self.fill_preview;
        self.handle = Some(std::thread::spawn(move || run_reader(&stream, &running, fill_preview)));
        tracing::debug!("Stream reader started");
    }

    /// Ask the reader to finish and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream.wake();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Stream reader panicked");
            }
            tracing::debug!("Stream reader stopped");
        }
    }

    /// Wake the reader after the consumer freed a slot
    pub fn wake(&self) {
        self.stream.wake();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stream(&self) -> &Arc<Stream> {
        &self.stream
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_reader(stream: &Stream, running: &AtomicBool, fill_preview: bool) {
    let mut inner = stream.inner.lock();
    while running.load(Ordering::SeqCst) {
        if !inner.wants_read() {
            stream.slot_freed.wait(&mut inner);
            continue;
        }
        let read = if fill_preview {
            inner.read_next_frame_with_preview()
        } else {
            inner.read_next_frame()
        };
        match read {
            Ok(_) => MutexGuard::bump(&mut inner),
            Err(e) => {
                tracing::warn!("Stream reader failed on {}: {}", inner.path.display(), e);
                // Retry only once someone touches the stream again
                if running.load(Ordering::SeqCst) {
                    stream.slot_freed.wait(&mut inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::format::PixelFormat;
    use crate::frame::Frame;
    use crate::types::Direction;
    use std::time::{Duration, Instant};

    fn open_gray_clip(dir: &std::path::Path, frames: u16) -> Arc<Stream> {
        let config = StreamConfig::default()
            .with_resolution(4, 4)
            .with_format(PixelFormat::Gray);
        let path = dir.join("clip.gray");
        let mut data = Vec::new();
        for n in 0..frames {
            let mut frame = Frame::new(4, 4, PixelFormat::Gray, 8).unwrap();
            frame.fill_channel(0, n);
            data.extend(frame.to_bytes(config.endianness));
        }
        std::fs::write(&path, data).unwrap();

        let stream = Arc::new(Stream::new());
        stream.open(&path, &config, Direction::Input).unwrap();
        stream
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_reader_fills_ring() {
        let dir = tempfile::tempdir().unwrap();
        let stream = open_gray_clip(dir.path(), 10);
        let mut worker = stream.spawn_reader();
        assert!(worker.is_running());

        // Frame 0 is exposed; the other three slots fill up
        assert!(wait_until(|| stream.inner.lock().ring.as_ref().is_some_and(|r| r.available() == 3)));

        let mut seen = vec![stream.current_frame().unwrap().plane(0)[0]];
        while !stream.set_next_frame().unwrap() {
            seen.push(stream.current_frame().unwrap().plane(0)[0]);
        }
        assert_eq!(seen, (0..10).collect::<Vec<u16>>());

        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_reader_fills_previews() {
        let dir = tempfile::tempdir().unwrap();
        let stream = open_gray_clip(dir.path(), 6);
        let mut worker = StreamWorker::new(Arc::clone(&stream)).with_rgb_preview(true);
        worker.start();
        assert!(wait_until(|| stream.inner.lock().ring.as_ref().is_some_and(|r| r.available() == 3)));

        // Frames 0 and 1 were primed by open, 2 and 3 came from the reader
        assert!(stream.current_frame().unwrap().rgb_preview().is_none());
        stream.set_next_frame().unwrap();
        stream.set_next_frame().unwrap();
        let frame = stream.current_frame().unwrap();
        assert_eq!(frame.plane(0)[0], 2);
        let preview = frame.rgb_preview().unwrap();
        assert_eq!(preview[0] & 0xFF, 2);
        worker.stop();
    }

    #[test]
    fn test_stop_while_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let stream = open_gray_clip(dir.path(), 2);
        let mut worker = StreamWorker::new(Arc::clone(&stream));
        worker.start();
        std::thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        // Stopping twice is harmless
        worker.stop();
    }

    #[test]
    fn test_seek_while_reading() {
        let dir = tempfile::tempdir().unwrap();
        let stream = open_gray_clip(dir.path(), 20);
        let _worker = stream.spawn_reader();

        stream.seek(15).unwrap();
        assert_eq!(stream.current_frame().unwrap().plane(0)[0], 15);
        assert!(!stream.set_next_frame().unwrap());
        assert_eq!(stream.current_frame().unwrap().plane(0)[0], 16);
    }
}
