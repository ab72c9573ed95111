//! Fixed-capacity circular sample queue
//!
//! One ring per audio channel. The ring itself is not synchronized: the
//! producer (CPU thread) and consumer (audio callback) share a whole set of
//! rings behind one guard in [`super::AudioPipe`].
//!
//! Memory is allocated once at construction; `push`/`pop` never allocate.

use std::fmt;

/// Error type for ring buffer construction
#[derive(Debug, Clone)]
pub struct RingBufferError(pub String);

impl fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RingBufferError {}

impl From<RingBufferError> for crate::DeviceError {
    fn from(err: RingBufferError) -> Self {
        crate::DeviceError::Config(err.0)
    }
}

/// Ring buffer of samples
///
/// # Invariants
/// - `0 <= count <= capacity`
/// - `head` and `tail` are always `< capacity`
/// - the producer only moves `tail`, the consumer only moves `head`
#[derive(Clone)]
pub struct RingBuffer<T> {
    samples: Box<[T]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a ring holding exactly `capacity` samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity is 0.
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            return Err(RingBufferError(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            samples: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        })
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of queued samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Free slots left.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.count
    }

    /// Append one sample. Returns `false` (and drops the sample) when full.
    #[inline]
    pub fn push(&mut self, sample: T) -> bool {
        if self.count == self.capacity() {
            return false;
        }
        self.samples[self.tail] = sample;
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        true
    }

    /// Append as many samples from `samples` as fit; returns how many did.
    pub fn push_slice(&mut self, samples: &[T]) -> usize {
        let to_write = samples.len().min(self.free());
        if to_write == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first_part = (capacity - self.tail).min(to_write);
        self.samples[self.tail..self.tail + first_part].copy_from_slice(&samples[..first_part]);
        self.samples[..to_write - first_part].copy_from_slice(&samples[first_part..to_write]);

        self.tail = (self.tail + to_write) % capacity;
        self.count += to_write;
        to_write
    }

    /// Remove the oldest sample.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let sample = self.samples[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        Some(sample)
    }

    /// Drop all queued samples.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.samples.len())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}
