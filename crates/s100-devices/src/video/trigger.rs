//! Display refresh triggers
//!
//! A display device only knows how to produce one frame. Who decides *when*
//! is the host's business, through one of two triggers:
//!
//! - [`RedrawTick`]: the host's render loop calls [`RedrawTick::tick`] once
//!   per host frame (cooperative)
//! - [`DisplayWorker`]: a dedicated thread produces frames at the device's
//!   own frame interval

use super::surface::Surface;
use crate::host::{DisplayDevice, FrameOutcome};
use crate::{DeviceError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Grace period for an in-flight frame before joining the worker
const STOP_GRACE: Duration = Duration::from_millis(50);

/// Something that drives a [`DisplayDevice`]
pub trait RefreshTrigger {
    /// Open the device and begin refreshing.
    fn start(&mut self) -> Result<()>;

    /// Stop refreshing and close the device. Idempotent.
    fn stop(&mut self);

    /// Whether frames are currently being produced.
    fn is_running(&self) -> bool;

    /// Frames produced since start.
    fn frames(&self) -> u64;
}

/// Cooperative trigger: one frame per host tick
pub struct RedrawTick<S: Surface> {
    device: Arc<dyn DisplayDevice>,
    surface: S,
    running: bool,
    frames: u64,
}

impl<S: Surface> RedrawTick<S> {
    /// Bind a device to the host surface
    pub fn new(device: Arc<dyn DisplayDevice>, surface: S) -> Self {
        Self {
            device,
            surface,
            running: false,
            frames: 0,
        }
    }

    /// Produce one frame. Returns `None` when not started.
    pub fn tick(&mut self) -> Option<FrameOutcome> {
        if !self.running {
            return None;
        }
        self.frames += 1;
        Some(self.device.produce_frame(&mut self.surface))
    }

    /// The host surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The host surface, mutably (e.g. to resize between ticks)
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: Surface> RefreshTrigger for RedrawTick<S> {
    fn start(&mut self) -> Result<()> {
        if !self.running {
            self.device.open();
            self.running = true;
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.device.close();
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn frames(&self) -> u64 {
        self.frames
    }
}

impl<S: Surface> Drop for RedrawTick<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Dedicated refresh thread
pub struct DisplayWorker<S: Surface + Send + 'static> {
    device: Arc<dyn DisplayDevice>,
    surface: Arc<Mutex<S>>,
    running: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl<S: Surface + Send + 'static> DisplayWorker<S> {
    /// Bind a device to a shared surface; call [`RefreshTrigger::start`] to run
    pub fn new(device: Arc<dyn DisplayDevice>, surface: S) -> Self {
        Self {
            device,
            surface: Arc::new(Mutex::new(surface)),
            running: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(AtomicU64::new(0)),
            thread: None,
        }
    }

    /// Surface shared with the worker thread
    pub fn surface(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.surface)
    }
}

/// Worker loop: one frame, then sleep out the rest of the interval
fn run_refresh_loop<S: Surface>(
    device: Arc<dyn DisplayDevice>,
    surface: Arc<Mutex<S>>,
    running: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
) {
    let interval = device.frame_interval();
    while running.load(Ordering::Acquire) {
        let started = Instant::now();
        {
            let mut surface = surface.lock();
            device.produce_frame(&mut *surface);
        }
        frames.fetch_add(1, Ordering::Relaxed);

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
}

impl<S: Surface + Send + 'static> RefreshTrigger for DisplayWorker<S> {
    fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        self.device.open();
        self.running.store(true, Ordering::Release);

        let device = Arc::clone(&self.device);
        let surface = Arc::clone(&self.surface);
        let running = Arc::clone(&self.running);
        let frames = Arc::clone(&self.frames);
        let thread = std::thread::Builder::new()
            .name("display-refresh".into())
            .spawn(move || run_refresh_loop(device, surface, running, frames))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                self.device.close();
                DeviceError::Other(format!("can't create display thread: {e}"))
            })?;
        self.thread = Some(thread);
        Ok(())
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        std::thread::sleep(STOP_GRACE);
        if thread.join().is_err() {
            log::warn!("display refresh thread panicked");
        }
        self.device.close();
    }

    fn is_running(&self) -> bool {
        self.thread.is_some() && self.running.load(Ordering::Acquire)
    }

    fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl<S: Surface + Send + 'static> Drop for DisplayWorker<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{FrameBuffer, Rgb};
    use std::sync::atomic::AtomicU32;

    /// Device that counts lifecycle calls and paints a fixed pixel
    struct CountingDevice {
        opens: AtomicU32,
        closes: AtomicU32,
        frames: AtomicU32,
    }

    impl CountingDevice {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                opens: AtomicU32::new(0),
                closes: AtomicU32::new(0),
                frames: AtomicU32::new(0),
            })
        }
    }

    impl DisplayDevice for CountingDevice {
        fn canvas_size(&self) -> (u32, u32) {
            (4, 4)
        }

        fn frame_interval(&self) -> Duration {
            Duration::from_millis(2)
        }

        fn open(&self) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn produce_frame(&self, surface: &mut dyn Surface) -> FrameOutcome {
            self.frames.fetch_add(1, Ordering::SeqCst);
            surface.clear(Rgb::BLACK);
            surface.fill_rect(1, 1, 1, 1, Rgb::new(1, 2, 3));
            surface.present();
            FrameOutcome::Drawn
        }
    }

    #[test]
    fn test_redraw_tick_only_draws_when_started() {
        let device = CountingDevice::new();
        let mut trigger = RedrawTick::new(device.clone(), FrameBuffer::new(4, 4));

        assert_eq!(trigger.tick(), None);
        trigger.start().expect("start");
        assert_eq!(trigger.tick(), Some(FrameOutcome::Drawn));
        assert_eq!(trigger.tick(), Some(FrameOutcome::Drawn));
        assert_eq!(trigger.frames(), 2);
        assert_eq!(trigger.surface().pixel(1, 1), Some(Rgb::new(1, 2, 3)));

        trigger.stop();
        trigger.stop();
        assert_eq!(trigger.tick(), None);
        assert_eq!(device.opens.load(Ordering::SeqCst), 1);
        assert_eq!(device.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_redraw_tick_closes_on_drop() {
        let device = CountingDevice::new();
        {
            let mut trigger = RedrawTick::new(device.clone(), FrameBuffer::new(4, 4));
            trigger.start().expect("start");
        }
        assert_eq!(device.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_redraw_tick_surface_access() {
        let device = CountingDevice::new();
        let mut trigger = RedrawTick::new(device, FrameBuffer::new(4, 4));
        trigger.start().expect("start");
        trigger.tick();
        trigger.surface_mut().clear(Rgb::new(9, 9, 9));
        assert_eq!(trigger.surface().pixel(1, 1), Some(Rgb::new(9, 9, 9)));
        assert_eq!(trigger.surface().frames_presented(), 1);
    }

    #[test]
    fn test_worker_runs_until_stopped() {
        let device = CountingDevice::new();
        let mut worker = DisplayWorker::new(device.clone(), FrameBuffer::new(4, 4));
        worker.start().expect("start");
        assert!(worker.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.frames() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        worker.stop();
        assert!(!worker.is_running());

        let produced = device.frames.load(Ordering::SeqCst);
        assert!(produced >= 3);
        // No frame after stop
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(device.frames.load(Ordering::SeqCst), produced);
        assert_eq!(worker.surface().lock().pixel(1, 1), Some(Rgb::new(1, 2, 3)));
        assert_eq!(device.opens.load(Ordering::SeqCst), 1);
        assert_eq!(device.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_worker_stops_on_drop() {
        let device = CountingDevice::new();
        {
            let mut worker = DisplayWorker::new(device.clone(), FrameBuffer::new(4, 4));
            worker.start().expect("start");
            worker.start().expect("second start is a no-op");
        }
        assert_eq!(device.opens.load(Ordering::SeqCst), 1);
        assert_eq!(device.closes.load(Ordering::SeqCst), 1);
    }
}
