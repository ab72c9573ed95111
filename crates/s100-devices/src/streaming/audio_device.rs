//! Audio device integration using rodio
//!
//! Feeds the system audio device from any [`AudioCallbacks`] implementation.
//! rodio pulls samples one at a time; the source asks the device for a whole
//! batch at once so the board's guard is taken once per batch, not per sample.

use crate::host::AudioCallbacks;
use crate::{DeviceError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Audio source that pulls batches from a device callback
struct CallbackSource {
    device: Arc<dyn AudioCallbacks>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    /// Internal batch buffer (one host callback worth of frames)
    buffer: Vec<f32>,
    /// Current position in the batch buffer
    buffer_pos: usize,
}

impl CallbackSource {
    fn new(
        device: Arc<dyn AudioCallbacks>,
        buffer_frames: usize,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let format = device.format();
        let len = buffer_frames.max(1) * format.channels.max(1) as usize;
        CallbackSource {
            device,
            sample_rate: format.sample_rate,
            channels: format.channels,
            finished,
            buffer: vec![0.0f32; len],
            buffer_pos: len, // Start by rendering a new batch
        }
    }
}

impl Source for CallbackSource {
    fn current_frame_len(&self) -> Option<usize> {
        // A fresh batch is rendered once the current one is exhausted
        match self.buffer.len().saturating_sub(self.buffer_pos) {
            0 => Some(self.buffer.len()),
            remaining => Some(remaining),
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for CallbackSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.buffer_pos >= self.buffer.len() {
            self.device.render(&mut self.buffer);
            self.buffer_pos = 0;
        }

        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    device: Arc<dyn AudioCallbacks>,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and start pulling from `device`.
    ///
    /// # Arguments
    /// * `device` - Board producing the samples
    /// * `buffer_frames` - Frames rendered per callback batch (defines latency)
    pub fn open(device: Arc<dyn AudioCallbacks>, buffer_frames: usize) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            DeviceError::AudioDevice(format!("Failed to create audio stream: {e}"))
        })?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| DeviceError::AudioDevice(format!("Failed to create audio sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        let source = CallbackSource::new(Arc::clone(&device), buffer_frames, Arc::clone(&finished));
        sink.append(source);
        device.open();

        let format = device.format();
        log::info!(
            "Audio device open: {} Hz, {} channels, {} frames per batch",
            format.sample_rate,
            format.channels,
            buffer_frames
        );

        Ok(AudioDevice {
            _stream: stream,
            sink,
            device,
            running: Arc::new(AtomicBool::new(true)),
            finished,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Check if audio device is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop pulling samples and close the device callbacks.
    pub fn close(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.finished.store(true, Ordering::Relaxed);
            self.sink.stop();
            self.device.close();
        }
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.close();
    }
}
