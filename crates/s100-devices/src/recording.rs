//! Recording and statistics sink
//!
//! Keeps a bounded per-channel log of every sample that reached the output
//! path, together with the ring occupancy and a fault status, and writes it
//! out as a 16-bit PCM WAV file at shutdown.

use crate::Result;
use serde::Serialize;
use std::io::{Seek, Write};
use std::path::Path;

/// Diagnostic status attached to a recorded sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum SampleStatus {
    /// Normal sample
    #[default]
    Ok = 0,
    /// Ring ran dry before this write
    Underflow = 1,
    /// Samples after this one were dropped, ring full
    Overflow = 2,
    /// Sample is part of a dropout gap
    Dropout = 3,
    /// The following write timed out waiting for the guard
    Timeout = 4,
}

/// One logged sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecordEntry {
    /// Emulated CPU tick (or frame index for synthesized boards)
    pub tick: u64,
    /// Ring occupancy after the sample was queued
    pub occupancy: u32,
    /// PCM value as written to the WAV file
    pub sample: i16,
    /// Fault status
    pub status: SampleStatus,
}

/// Bounded multi-channel sample log
#[derive(Debug)]
pub struct Recorder {
    channels: Vec<Vec<RecordEntry>>,
    limit: usize,
    sample_rate: u32,
    truncated: bool,
}

impl Recorder {
    /// Reserve space for `limit` entries per channel.
    ///
    /// Returns `None` if the reservation fails; callers continue without
    /// recording.
    pub fn with_limit(channels: usize, limit: usize, sample_rate: u32) -> Option<Self> {
        let mut logs = Vec::with_capacity(channels);
        for _ in 0..channels {
            let mut log = Vec::new();
            if let Err(err) = log.try_reserve_exact(limit) {
                log::warn!(
                    "Could not reserve {limit} recording entries ({err}), recording disabled"
                );
                return None;
            }
            logs.push(log);
        }
        Some(Self {
            channels: logs,
            limit,
            sample_rate,
            truncated: false,
        })
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Output sample rate written to the WAV header.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Entries recorded for `channel`.
    pub fn entries(&self, channel: usize) -> &[RecordEntry] {
        self.channels.get(channel).map_or(&[], Vec::as_slice)
    }

    /// Frames in the export: the longest channel.
    pub fn frame_count(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True once any channel hit the limit and samples were discarded.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Append one entry to `channel`. Entries past the limit are discarded.
    pub fn record(&mut self, channel: usize, entry: RecordEntry) {
        let limit = self.limit;
        let Some(log) = self.channels.get_mut(channel) else {
            return;
        };
        if log.len() < limit {
            log.push(entry);
        } else {
            self.truncated = true;
        }
    }

    /// Append one frame (one sample per channel) at `tick`.
    pub fn record_frame(&mut self, tick: u64, samples: &[i16]) {
        for (channel, &sample) in samples.iter().enumerate() {
            self.record(
                channel,
                RecordEntry {
                    tick,
                    occupancy: 0,
                    sample,
                    status: SampleStatus::Ok,
                },
            );
        }
    }

    /// Tag the most recent entry of `channel` with `status`.
    pub fn mark_last(&mut self, channel: usize, status: SampleStatus) {
        if let Some(entry) = self.channels.get_mut(channel).and_then(|log| log.last_mut()) {
            entry.status = status;
        }
    }

    /// Write the log as an interleaved 16-bit PCM WAV stream.
    ///
    /// Channels shorter than the longest one are padded with silence.
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels.len() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut wav = hound::WavWriter::new(writer, spec)?;
        for frame in 0..self.frame_count() {
            for log in &self.channels {
                let sample = log.get(frame).map_or(0, |entry| entry.sample);
                wav.write_sample(sample)?;
            }
        }
        wav.finalize()?;
        Ok(())
    }

    /// Export to a WAV file at `path`.
    pub fn export_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_wav(file)?;
        log::info!(
            "Wrote {} frames ({} channels @ {} Hz) to {}",
            self.frame_count(),
            self.channels.len(),
            self.sample_rate,
            path.display()
        );
        Ok(())
    }
}
