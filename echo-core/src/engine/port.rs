//! Driver-side handles onto an [`EchoEngine`].
//!
//! A capture driver gets a [`CapturePort`] and a playback driver a
//! [`PlaybackPort`]. Every method is non-blocking and allocation-free, so
//! both are safe to call from a real-time audio callback. The ports keep
//! the engine's device-held counters in step with what the driver holds.

use std::sync::Arc;

use super::dispatch::{Dispatch, EngineMessage};
use super::echo_engine::EchoEngine;
use crate::buffer::sample_buffer::SampleBuffer;
use crate::models::audio_models::PcmFormat;

#[derive(Debug, Clone)]
pub struct CapturePort {
    engine: Arc<EchoEngine>,
}

impl CapturePort {
    pub fn new(engine: Arc<EchoEngine>) -> Self {
        Self { engine }
    }

    pub fn format(&self) -> PcmFormat {
        self.engine.config().format()
    }

    pub fn frames_per_period(&self) -> usize {
        self.engine.config().frames_per_period as usize
    }

    /// Take an empty buffer from the free pool, or `None` if every buffer
    /// is in flight (the driver should skip this period).
    pub fn acquire(&self) -> Option<SampleBuffer> {
        self.engine.take_free()
    }

    /// Hand a filled buffer to the engine for processing and playback.
    pub fn submit(&self, buf: SampleBuffer) -> Dispatch {
        self.engine.dispatch(EngineMessage::RecordedAudioAvailable(buf))
    }

    /// Return a buffer without recording into it, e.g. when stopping
    /// mid-period.
    pub fn abandon(&self, buf: SampleBuffer) -> Dispatch {
        self.engine.return_unrecorded(buf)
    }

    /// Diagnostic buffer counts, through the same dispatch entry point.
    pub fn buffer_counts(&self) -> Dispatch {
        self.engine.dispatch(EngineMessage::RetrieveBufferCounts)
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackPort {
    engine: Arc<EchoEngine>,
}

impl PlaybackPort {
    pub fn new(engine: Arc<EchoEngine>) -> Self {
        Self { engine }
    }

    pub fn format(&self) -> PcmFormat {
        self.engine.config().format()
    }

    pub fn frames_per_period(&self) -> usize {
        self.engine.config().frames_per_period as usize
    }

    /// Take the oldest processed buffer, or `None` if nothing is ready
    /// (the driver should render silence this period).
    pub fn acquire(&self) -> Option<SampleBuffer> {
        self.engine.take_filled()
    }

    /// Return a rendered buffer to the free pool.
    pub fn release(&self, buf: SampleBuffer) -> Dispatch {
        self.engine.dispatch(EngineMessage::PlaybackComplete(buf))
    }

    pub fn buffer_counts(&self) -> Dispatch {
        self.engine.dispatch(EngineMessage::RetrieveBufferCounts)
    }
}
