//! Software playback driver.
//!
//! Drains processed buffers from the engine on a dedicated thread and
//! hands their samples to a [`SampleSink`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use echo_core::{DriverDirection, DriverInfo, EchoError, PlaybackDriver, PlaybackPort};

use crate::pacing::{period_duration, Pace};
use crate::signal::{discard, SampleSink};

/// Loopback playback: a thread that plays the role of the output device.
///
/// When no processed buffer is ready the period is counted as an underrun
/// and nothing is passed to the sink.
pub struct LoopbackPlayback {
    name: String,
    pace: Pace,
    sink: Option<SampleSink>,
    running: Arc<AtomicBool>,
    rendered: Arc<AtomicU64>,
    underruns: Arc<AtomicU64>,
    playback_handle: Option<thread::JoinHandle<SampleSink>>,
}

impl LoopbackPlayback {
    pub fn new(name: impl Into<String>, sink: SampleSink) -> Self {
        Self {
            name: name.into(),
            pace: Pace::default(),
            sink: Some(sink),
            running: Arc::new(AtomicBool::new(false)),
            rendered: Arc::new(AtomicU64::new(0)),
            underruns: Arc::new(AtomicU64::new(0)),
            playback_handle: None,
        }
    }

    pub fn discarding() -> Self {
        Self::new("Loopback Output", discard())
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = pace;
        self
    }

    /// Buffers passed to the sink so far.
    pub fn rendered(&self) -> u64 {
        self.rendered.load(Ordering::Acquire)
    }

    /// Shared handle to the rendered-period counter, for polling while the
    /// driver is owned by a session.
    pub fn rendered_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.rendered)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Acquire)
    }
}

impl PlaybackDriver for LoopbackPlayback {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, port: PlaybackPort) -> Result<(), EchoError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(EchoError::DriverFailed("loopback playback already running".into()));
        }
        let sink = self
            .sink
            .take()
            .ok_or_else(|| EchoError::DriverFailed("loopback playback has no sink".into()))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let rendered = Arc::clone(&self.rendered);
        let underruns = Arc::clone(&self.underruns);
        let pace = self.pace;

        let handle = thread::Builder::new()
            .name("loopback-playback".into())
            .spawn(move || playback_loop(running, rendered, underruns, port, sink, pace))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                EchoError::DriverFailed(format!("failed to spawn playback thread: {}", e))
            })?;

        self.playback_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EchoError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.playback_handle.take() {
            let sink = handle
                .join()
                .map_err(|_| EchoError::DriverFailed("loopback playback thread panicked".into()))?;
            self.sink = Some(sink);
        }
        Ok(())
    }

    fn device_info(&self) -> DriverInfo {
        DriverInfo {
            id: "loopback-out".into(),
            name: self.name.clone(),
            direction: DriverDirection::Playback,
        }
    }
}

impl Drop for LoopbackPlayback {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{}", e);
        }
    }
}

fn playback_loop(
    running: Arc<AtomicBool>,
    rendered: Arc<AtomicU64>,
    underruns: Arc<AtomicU64>,
    port: PlaybackPort,
    mut sink: SampleSink,
    pace: Pace,
) -> SampleSink {
    let format = port.format();
    let frames = port.frames_per_period();
    let period = period_duration(frames, format.sample_rate);
    let mut scratch: Vec<i16> = Vec::with_capacity(frames * format.channels as usize);

    while running.load(Ordering::SeqCst) {
        match port.acquire() {
            Some(buf) => {
                scratch.clear();
                buf.read_samples_into(&mut scratch);
                port.release(buf);
                sink(&scratch);
                rendered.fetch_add(1, Ordering::AcqRel);
            }
            None => {
                underruns.fetch_add(1, Ordering::Relaxed);
            }
        }
        pace.wait(period);
    }

    log::debug!(
        "loopback playback stopped: {} rendered, {} underruns",
        rendered.load(Ordering::Acquire),
        underruns.load(Ordering::Relaxed)
    );
    sink
}
