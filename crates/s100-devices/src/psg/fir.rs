//! Oversampling reconstruction for the PSG
//!
//! The chip is stepped several times per output sample. Each internal sample
//! is fed to a cubic interpolator, the interpolated curve is sampled 8 times
//! per output sample and a symmetric half-band FIR folds those 8 back into
//! one.

use super::tables::{DECIMATE_FACTOR, FIR_CENTER, FIR_KERNEL, FIR_SIZE};

/// Cubic interpolator over the last four internal samples
#[derive(Clone, Debug, Default)]
pub(crate) struct CubicInterpolator {
    c: [f64; 3],
    y: [f64; 4],
}

impl CubicInterpolator {
    /// Shift a new internal sample in and refit the curve.
    pub(crate) fn push(&mut self, sample: f64) {
        let y = &mut self.y;
        y[0] = y[1];
        y[1] = y[2];
        y[2] = y[3];
        y[3] = sample;

        let y1 = y[2] - y[0];
        self.c[0] = 0.5 * y[1] + 0.25 * (y[0] + y[2]);
        self.c[1] = 0.5 * y1;
        self.c[2] = 0.25 * (y[3] - y[1] - y1);
    }

    /// Value of the fitted curve at fractional position `x` in `[0, 1)`.
    #[inline]
    pub(crate) fn eval(&self, x: f64) -> f64 {
        (self.c[2] * x + self.c[1]) * x + self.c[0]
    }
}

/// Sliding-window decimator
///
/// The history is stored twice as long as the kernel so each block can be
/// written in front of the previous ones without shifting the whole window.
#[derive(Clone)]
pub(crate) struct FirDecimator {
    history: Box<[f64; FIR_SIZE * 2]>,
    index: usize,
}

impl FirDecimator {
    pub(crate) fn new() -> Self {
        Self {
            history: Box::new([0.0; FIR_SIZE * 2]),
            index: 0,
        }
    }

    /// Append one block of oversampled values and return the filtered sample.
    ///
    /// `block[i]` lands at window position `i`, so the newest value is
    /// expected at index 0.
    pub(crate) fn push_block(&mut self, block: &[f64; DECIMATE_FACTOR]) -> f64 {
        let base = FIR_SIZE - self.index * DECIMATE_FACTOR;
        self.index = (self.index + 1) % (FIR_SIZE / DECIMATE_FACTOR - 1);

        let window = &mut self.history[base..base + FIR_SIZE];
        window[..DECIMATE_FACTOR].copy_from_slice(block);
        decimate(window)
    }

    pub(crate) fn reset(&mut self) {
        self.history.fill(0.0);
        self.index = 0;
    }
}

impl std::fmt::Debug for FirDecimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirDecimator")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Apply the kernel to a `FIR_SIZE` window, then carry its head to the tail
/// for the next block.
fn decimate(x: &mut [f64]) -> f64 {
    let mut y = FIR_CENTER * x[FIR_SIZE / 2];
    for (k, &c) in FIR_KERNEL.iter().enumerate().skip(1) {
        if c != 0.0 {
            y += c * (x[k] + x[FIR_SIZE - k]);
        }
    }
    x.copy_within(..DECIMATE_FACTOR, FIR_SIZE - DECIMATE_FACTOR);
    y
}
