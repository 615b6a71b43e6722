use std::sync::Arc;

use crate::engine::echo_engine::EchoEngine;
use crate::engine::port::{CapturePort, PlaybackPort};
use crate::models::audio_models::{BufferDistribution, EngineStatsSnapshot};
use crate::models::config::{EchoConfiguration, MAX_DELAY_MS};
use crate::models::error::EchoError;
use crate::models::state::EchoState;
use crate::traits::audio_driver::{CaptureDriver, PlaybackDriver};
use crate::traits::echo_delegate::EchoDelegate;

/// Control surface for one echo session.
///
/// Generic over the capture and playback backends. Creating the session
/// allocates the engine; dropping it (or calling [`destroy`](Self::destroy))
/// stops both drivers before the pool and effect are released.
///
/// ```text
/// [CaptureDriver] → CapturePort ─┐
///                                 ├→ [EchoEngine: queues + StereoDelay]
/// [PlaybackDriver] ← PlaybackPort┘
/// ```
pub struct EchoSession<C: CaptureDriver, P: PlaybackDriver> {
    engine: Arc<EchoEngine>,
    capture: Option<C>,
    playback: Option<P>,
    state: EchoState,
    delegate: Option<Arc<dyn EchoDelegate>>,
}

impl<C: CaptureDriver, P: PlaybackDriver> EchoSession<C, P> {
    /// Allocate the buffer pool, both queues and the delay effect.
    pub fn create(config: EchoConfiguration) -> Result<Self, EchoError> {
        let engine = Arc::new(EchoEngine::new(config)?);
        Ok(Self {
            engine,
            capture: None,
            playback: None,
            state: EchoState::Created,
            delegate: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn EchoDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> EchoState {
        self.state
    }

    pub fn engine(&self) -> &Arc<EchoEngine> {
        &self.engine
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.engine.stats()
    }

    /// Change the left/right delay times while running.
    ///
    /// Blocks briefly on the effect lock; never call from an audio callback.
    /// Delays above [`MAX_DELAY_MS`] are rejected as at creation.
    pub fn configure_delay(&self, delay_left_ms: u32, delay_right_ms: u32) -> Result<(), EchoError> {
        if let Some(ms) = [delay_left_ms, delay_right_ms].into_iter().find(|&ms| ms > MAX_DELAY_MS) {
            return Err(self.report(EchoError::ConfigurationFailed(format!(
                "delay {}ms exceeds {}ms",
                ms, MAX_DELAY_MS
            ))));
        }
        log::info!(
            "session {}: configure delay L={}ms R={}ms",
            self.engine.id(),
            delay_left_ms,
            delay_right_ms
        );
        self.engine
            .effect()
            .set_delay_time(delay_left_ms, delay_right_ms)
            .map_err(|e| self.report(e))
    }

    pub fn set_decay_weight(&self, weight: f32) {
        log::info!("session {}: decay weight {}", self.engine.id(), weight);
        self.engine.effect().set_decay_weight(weight);
    }

    pub fn create_capture_path(&mut self, driver: C) -> Result<(), EchoError> {
        self.ensure_stopped("create capture path")?;
        if !driver.is_available() {
            return Err(self.report(EchoError::DriverFailed(format!(
                "capture device {} not available",
                driver.device_info().name
            ))));
        }
        log::debug!("session {}: capture path on {}", self.engine.id(), driver.device_info().name);
        self.capture = Some(driver);
        Ok(())
    }

    /// Remove and return the capture driver.
    pub fn delete_capture_path(&mut self) -> Result<Option<C>, EchoError> {
        self.ensure_stopped("delete capture path")?;
        Ok(self.capture.take())
    }

    pub fn create_playback_path(&mut self, driver: P) -> Result<(), EchoError> {
        self.ensure_stopped("create playback path")?;
        if !driver.is_available() {
            return Err(self.report(EchoError::DriverFailed(format!(
                "playback device {} not available",
                driver.device_info().name
            ))));
        }
        log::debug!("session {}: playback path on {}", self.engine.id(), driver.device_info().name);
        self.playback = Some(driver);
        Ok(())
    }

    /// Remove and return the playback driver.
    pub fn delete_playback_path(&mut self) -> Result<Option<P>, EchoError> {
        self.ensure_stopped("delete playback path")?;
        Ok(self.playback.take())
    }

    /// Start playback (waiting for data), then capture.
    pub fn start(&mut self) -> Result<(), EchoError> {
        self.ensure_stopped("start")?;
        let (Some(capture), Some(playback)) = (self.capture.as_mut(), self.playback.as_mut()) else {
            return Err(EchoError::InvalidState(
                "both capture and playback paths are required to start".into(),
            ));
        };

        if let Err(e) = playback.start(PlaybackPort::new(Arc::clone(&self.engine))) {
            return Err(self.report(e));
        }
        if let Err(e) = capture.start(CapturePort::new(Arc::clone(&self.engine))) {
            if let Err(stop_err) = playback.stop() {
                log::warn!("failed to stop playback after capture start failure: {}", stop_err);
            }
            return Err(self.report(e));
        }

        self.set_state(EchoState::Running);
        Ok(())
    }

    /// Stop capture, then playback. Both callback contexts have fully
    /// exited when this returns.
    pub fn stop(&mut self) -> Result<(), EchoError> {
        if !self.state.is_running() {
            return Err(EchoError::InvalidState("can only stop a running session".into()));
        }

        let result = self.stop_drivers();
        self.set_state(EchoState::Stopped);
        self.buffer_distribution();
        result.map_err(|e| self.report(e))
    }

    /// Where every buffer sits right now. Notifies the delegate when the
    /// holders do not add up to the pool size.
    pub fn buffer_distribution(&self) -> BufferDistribution {
        let distribution = self.engine.buffer_distribution();
        if !distribution.is_conserved() {
            if let Some(ref delegate) = self.delegate {
                delegate.on_buffers_lost(&distribution);
            }
        }
        distribution
    }

    /// Stop everything and release all session state.
    pub fn destroy(self) {
        // Drop does the work.
    }

    // --- Internal helpers ---

    fn stop_drivers(&mut self) -> Result<(), EchoError> {
        let capture = self.capture.as_mut().map_or(Ok(()), |c| c.stop());
        let playback = self.playback.as_mut().map_or(Ok(()), |p| p.stop());
        capture.and(playback)
    }

    fn ensure_stopped(&self, operation: &str) -> Result<(), EchoError> {
        if self.state.is_running() {
            return Err(EchoError::InvalidState(format!("cannot {} while running", operation)));
        }
        Ok(())
    }

    fn set_state(&mut self, state: EchoState) {
        log::info!("session {}: {} -> {}", self.engine.id(), self.state.as_str(), state.as_str());
        self.state = state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }

    fn report(&self, error: EchoError) -> EchoError {
        log::error!("session {}: {}", self.engine.id(), error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        error
    }
}

impl<C: CaptureDriver, P: PlaybackDriver> Drop for EchoSession<C, P> {
    fn drop(&mut self) {
        if self.state.is_running() {
            if let Err(e) = self.stop_drivers() {
                log::warn!("session {}: driver stop failed during teardown: {}", self.engine.id(), e);
            }
            self.state = EchoState::Stopped;
        }
        log::info!("session {} destroyed", self.engine.id());
    }
}
