//! DC offset removal filter
//!
//! The PSG mixer only produces positive levels, so its output sits on a DC
//! offset that moves with the content. This filter subtracts a moving
//! average to center the output around zero.

/// History buffer size (1024 samples = ~23ms at 44.1kHz)
const HISTORY_SIZE: usize = 1024;

/// DC offset removal filter using a moving sum
#[derive(Clone)]
pub struct DcFilter {
    /// Circular buffer of recent samples
    delay: Box<[f64; HISTORY_SIZE]>,
    /// Current write position in buffer
    position: usize,
    /// Running sum of all samples in buffer
    sum: f64,
}

impl DcFilter {
    /// Create a new DC filter
    pub fn new() -> Self {
        Self {
            delay: Box::new([0.0; HISTORY_SIZE]),
            position: 0,
            sum: 0.0,
        }
    }

    /// Process a sample and return it with the moving average removed
    #[inline]
    pub fn process(&mut self, sample: f64) -> f64 {
        self.sum += sample - self.delay[self.position];
        self.delay[self.position] = sample;
        self.position = (self.position + 1) & (HISTORY_SIZE - 1);

        sample - self.sum / HISTORY_SIZE as f64
    }

    /// Reset the filter state
    pub fn reset(&mut self) {
        self.delay.fill(0.0);
        self.position = 0;
        self.sum = 0.0;
    }
}

impl Default for DcFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DcFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DcFilter")
            .field("position", &self.position)
            .field("sum", &self.sum)
            .finish_non_exhaustive()
    }
}
