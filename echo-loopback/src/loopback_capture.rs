//! Software capture driver.
//!
//! Synthesizes PCM from a [`SignalSource`] on a dedicated thread, one
//! period at a time, drawing empty buffers from the engine's free pool.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use echo_core::{CaptureDriver, CapturePort, DriverDirection, DriverInfo, EchoError};

use crate::pacing::{period_duration, Pace};
use crate::signal::{silence, SignalSource};

/// Loopback capture: a thread that plays the role of the input device.
pub struct LoopbackCapture {
    name: String,
    pace: Pace,
    max_periods: Option<u64>,
    source: Option<SignalSource>,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    capture_handle: Option<thread::JoinHandle<SignalSource>>,
}

impl LoopbackCapture {
    pub fn new(name: impl Into<String>, source: SignalSource) -> Self {
        Self {
            name: name.into(),
            pace: Pace::default(),
            max_periods: None,
            source: Some(source),
            running: Arc::new(AtomicBool::new(false)),
            delivered: Arc::new(AtomicU64::new(0)),
            capture_handle: None,
        }
    }

    pub fn silent() -> Self {
        Self::new("Loopback Input", silence())
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = pace;
        self
    }

    /// Deliver at most `periods` periods, then idle until stopped.
    pub fn with_max_periods(mut self, periods: u64) -> Self {
        self.max_periods = Some(periods);
        self
    }

    /// Periods submitted to the engine so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl CaptureDriver for LoopbackCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, port: CapturePort) -> Result<(), EchoError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(EchoError::DriverFailed("loopback capture already running".into()));
        }
        let source = self
            .source
            .take()
            .ok_or_else(|| EchoError::DriverFailed("loopback capture has no signal source".into()))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let delivered = Arc::clone(&self.delivered);
        let pace = self.pace;
        let max_periods = self.max_periods;

        let handle = thread::Builder::new()
            .name("loopback-capture".into())
            .spawn(move || capture_loop(running, delivered, port, source, pace, max_periods))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                EchoError::DriverFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        self.capture_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EchoError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            let source = handle
                .join()
                .map_err(|_| EchoError::DriverFailed("loopback capture thread panicked".into()))?;
            self.source = Some(source);
        }
        Ok(())
    }

    fn device_info(&self) -> DriverInfo {
        DriverInfo {
            id: "loopback-in".into(),
            name: self.name.clone(),
            direction: DriverDirection::Capture,
        }
    }
}

impl Drop for LoopbackCapture {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{}", e);
        }
    }
}

/// One iteration per period: take a free buffer, synthesize into it, hand
/// it to the engine. Returns the source so the driver can be restarted.
fn capture_loop(
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    port: CapturePort,
    mut source: SignalSource,
    pace: Pace,
    max_periods: Option<u64>,
) -> SignalSource {
    let format = port.format();
    let frames = port.frames_per_period();
    let period = period_duration(frames, format.sample_rate);
    let mut scratch = vec![0i16; frames * format.channels as usize];

    log::debug!("loopback capture running: {} frames every {:?}", frames, period);

    while running.load(Ordering::SeqCst) {
        let exhausted = max_periods.is_some_and(|limit| delivered.load(Ordering::Acquire) >= limit);
        if !exhausted {
            match port.acquire() {
                Some(mut buf) => {
                    scratch.fill(0);
                    source(&mut scratch);
                    buf.write_samples(&scratch);
                    port.submit(buf);
                    delivered.fetch_add(1, Ordering::AcqRel);
                }
                None => log::trace!("loopback capture: no free buffer, skipping period"),
            }
        }
        pace.wait(period);
    }

    log::debug!("loopback capture stopped after {} periods", delivered.load(Ordering::Acquire));
    source
}
