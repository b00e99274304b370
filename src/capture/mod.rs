//! Bounded frame buffering for capture preparation.
//!
//! While the user frames the shot, the capture collaborator streams preview
//! frames into a `FrameBuffer`; the liveness detector reads snapshots of
//! it. The buffer is a fixed-capacity ring ordered by timestamp: pushing
//! at capacity evicts the oldest frame, and a frame whose timestamp does
//! not advance past the newest held frame is dropped.

use crate::raster::RasterBuffer;
use crate::trace::trace_event;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default ring capacity.
pub const DEFAULT_FRAME_CAPACITY: usize = 10;

/// Minimum collection window the caller should wait for before enabling
/// capture, in milliseconds. A timing contract for the capture flow, not
/// internal buffer state.
pub const DEFAULT_COLLECTION_WINDOW_MS: u64 = 1500;

/// One preview frame with its monotonic timestamp.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Raw frame pixels.
    pub image: RasterBuffer,
    /// Monotonic capture timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl Frame {
    /// Creates a frame.
    pub fn new(image: RasterBuffer, timestamp_ms: u64) -> Self {
        Self {
            image,
            timestamp_ms,
        }
    }
}

/// Fixed-capacity, time-ordered ring of recent frames.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FRAME_CAPACITY)
    }
}

impl FrameBuffer {
    /// Creates a buffer holding at most `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of buffered frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true when no frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pushes a frame, evicting the oldest once at capacity.
    ///
    /// Returns false (and keeps the buffer unchanged) when the frame's
    /// timestamp does not advance past the newest held frame; the ring
    /// never holds frames out of timestamp order.
    pub fn push(&mut self, frame: Frame) -> bool {
        if let Some(newest) = self.frames.back() {
            if frame.timestamp_ms <= newest.timestamp_ms {
                trace_event!(
                    "frame_dropped",
                    timestamp_ms = frame.timestamp_ms,
                    newest_ms = newest.timestamp_ms
                );
                return false;
            }
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        true
    }

    /// Returns the buffered frames oldest-first without mutating the ring.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.iter().cloned().collect()
    }

    /// Milliseconds covered from the oldest to the newest buffered frame.
    pub fn span_ms(&self) -> u64 {
        match (self.frames.front(), self.frames.back()) {
            (Some(oldest), Some(newest)) => newest.timestamp_ms - oldest.timestamp_ms,
            _ => 0,
        }
    }

    /// Removes all buffered frames.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Mutex-guarded frame buffer for one concurrent writer and one reader.
///
/// Frame ingestion and liveness analysis run as independent units of work;
/// this wrapper gives both a cloneable handle. Lock scope is a single push
/// or snapshot, so neither side can starve the other.
#[derive(Clone, Debug)]
pub struct SharedFrameBuffer {
    inner: Arc<Mutex<FrameBuffer>>,
}

impl Default for SharedFrameBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FRAME_CAPACITY)
    }
}

impl SharedFrameBuffer {
    /// Creates a shared buffer holding at most `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FrameBuffer::with_capacity(capacity))),
        }
    }

    /// Pushes a frame; see [`FrameBuffer::push`].
    pub fn push(&self, frame: Frame) -> bool {
        self.lock().push(frame)
    }

    /// Returns the current frames oldest-first; see [`FrameBuffer::snapshot`].
    pub fn snapshot(&self) -> Vec<Frame> {
        self.lock().snapshot()
    }

    /// Milliseconds covered by the buffered frames.
    pub fn span_ms(&self) -> u64 {
        self.lock().span_ms()
    }

    /// Number of buffered frames.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when no frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes all buffered frames.
    pub fn clear(&self) {
        self.lock().clear()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrameBuffer> {
        // A poisoned lock means a panic mid-push; the ring holds only
        // plain data, so continuing with it is sound.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(timestamp_ms: u64, value: u8) -> Frame {
        Frame::new(
            RasterBuffer::gray_filled(4, 4, value).unwrap(),
            timestamp_ms,
        )
    }

    #[test]
    fn push_beyond_capacity_evicts_oldest_in_order() {
        let mut buffer = FrameBuffer::with_capacity(3);
        for i in 0..5u64 {
            assert!(buffer.push(frame(i * 100, i as u8)));
        }
        let frames = buffer.snapshot();
        assert_eq!(frames.len(), 3);
        let stamps: Vec<u64> = frames.iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(stamps, vec![200, 300, 400]);
    }

    #[test]
    fn non_advancing_timestamps_are_dropped() {
        let mut buffer = FrameBuffer::default();
        assert!(buffer.push(frame(100, 1)));
        assert!(!buffer.push(frame(100, 2)));
        assert!(!buffer.push(frame(50, 3)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn span_covers_oldest_to_newest() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(buffer.span_ms(), 0);
        buffer.push(frame(1000, 0));
        buffer.push(frame(2600, 1));
        assert_eq!(buffer.span_ms(), 1600);
        assert!(buffer.span_ms() >= DEFAULT_COLLECTION_WINDOW_MS);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let mut buffer = FrameBuffer::default();
        buffer.push(frame(1, 0));
        buffer.push(frame(2, 1));
        let _ = buffer.snapshot();
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn shared_buffer_supports_writer_and_reader_threads() {
        let shared = SharedFrameBuffer::with_capacity(8);
        let writer = shared.clone();
        let handle = std::thread::spawn(move || {
            for i in 1..=50u64 {
                writer.push(frame(i, (i % 255) as u8));
            }
        });
        // Reader takes snapshots while the writer is pushing; every
        // snapshot must be internally ordered.
        for _ in 0..20 {
            let frames = shared.snapshot();
            assert!(frames.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        }
        handle.join().unwrap();
        assert_eq!(shared.len(), 8);
        assert_eq!(shared.snapshot().last().unwrap().timestamp_ms, 50);
    }
}
