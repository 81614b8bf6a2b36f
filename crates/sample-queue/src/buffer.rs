//! SPSC Ring Buffer Implementation

use fatigue_core::Sample;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default queue capacity (1800 frames = ~60 s at 30 fps)
pub const DEFAULT_CAPACITY: usize = 1800;

/// Lock-free SPSC queue for openness samples
pub struct SampleQueue {
    /// Pre-allocated storage
    storage: Box<[Sample]>,
    /// Capacity of the queue
    capacity: usize,
    /// Head position (write pointer)
    head: AtomicUsize,
    /// Tail position (read pointer)
    tail: AtomicUsize,
    /// Total samples written (for statistics)
    total_written: AtomicUsize,
}

impl SampleQueue {
    /// Create a new queue with given capacity
    pub fn new(capacity: usize) -> Self {
        let storage: Vec<Sample> = (0..capacity).map(|_| Sample::default()).collect();
        Self {
            storage: storage.into_boxed_slice(),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            total_written: AtomicUsize::new(0),
        }
    }

    /// Create a queue with default capacity (1800 frames)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Push a sample into the queue (overwrites oldest if full)
    ///
    /// Dropping the oldest frame under backpressure is deliberate: a stale
    /// openness sample is worthless to a real-time fatigue display.
    pub fn push(&self, sample: Sample) {
        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) % self.capacity;

        // SAFETY: single producer, storage is pre-allocated
        unsafe {
            let ptr = self.storage.as_ptr() as *mut Sample;
            std::ptr::write(ptr.add(head), sample);
        }

        self.head.store(next_head, Ordering::Release);
        self.total_written.fetch_add(1, Ordering::Relaxed);

        // If the queue is full, advance tail
        let tail = self.tail.load(Ordering::Relaxed);
        if next_head == tail {
            self.tail.store((tail + 1) % self.capacity, Ordering::Release);
        }
    }

    /// Pop the oldest sample, if any (single consumer)
    pub fn pop(&self) -> Option<Sample> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        let sample = self.storage[tail];
        self.tail.store((tail + 1) % self.capacity, Ordering::Release);
        Some(sample)
    }

    /// Get the number of samples currently queued
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            self.capacity - tail + head
        }
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }

    /// Get total samples written (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Clear the queue
    pub fn clear(&self) {
        self.tail
            .store(self.head.load(Ordering::Relaxed), Ordering::Release);
    }
}

// SAFETY: SampleQueue is designed for SPSC use; one producer thread pushes
// while one consumer thread pops, coordinated through the atomic indices.
unsafe impl Send for SampleQueue {}
unsafe impl Sync for SampleQueue {}
