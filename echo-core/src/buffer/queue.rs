//! Bounded non-blocking FIFO used for the free and filled buffer pools.
//!
//! Both ends are called from real-time audio callbacks, so neither `push`
//! nor `pop` ever parks the calling thread: a full queue hands the value
//! back and an empty queue returns `None`, and the caller decides whether
//! to retry next period or pass the audio through.

use crossbeam::queue::ArrayQueue;

use super::sample_buffer::SampleBuffer;

/// Fixed-capacity lock-free FIFO of owned buffer handles.
///
/// Safe for a producer and a consumer on different threads with no
/// external lock.
#[derive(Debug)]
pub struct BufferQueue<T = SampleBuffer> {
    slots: ArrayQueue<T>,
}

impl<T> BufferQueue<T> {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer queue capacity must be positive");
        Self {
            slots: ArrayQueue::new(capacity),
        }
    }

    /// Append `item` if there is room.
    ///
    /// Returns `Err(item)` with no side effect when the queue is full, so
    /// the handle is never lost.
    pub fn push(&self, item: T) -> Result<(), T> {
        self.slots.push(item)
    }

    /// Remove and return the oldest item, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.slots.pop()
    }

    /// Current occupancy. Diagnostic only: it may be stale as soon as it
    /// is read.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }
}
