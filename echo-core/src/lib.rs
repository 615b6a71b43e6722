//! # echo-core
//!
//! Platform-agnostic real-time stereo echo engine.
//!
//! Moves fixed-size PCM buffers from a capture driver, through an integer
//! stereo delay effect, to a playback driver. Buffers circulate between a
//! free and a filled lock-free queue, so neither audio callback ever
//! blocks on the other. Platform backends implement `CaptureDriver` and
//! `PlaybackDriver` and plug into the generic `EchoSession`.
//!
//! ## Architecture
//!
//! ```text
//! echo-core (this crate)
//! ├── traits/   ← CaptureDriver, PlaybackDriver, EchoDelegate
//! ├── models/   ← EchoConfiguration, EchoError, EchoState, PcmFormat, BufferDistribution
//! ├── buffer/   ← SampleBuffer, BufferQueue
//! ├── effect/   ← DelayLine, StereoDelay
//! ├── engine/   ← EchoEngine, EngineMessage dispatch, Capture/PlaybackPort
//! └── session/  ← EchoSession (control surface)
//! ```

pub mod buffer;
pub mod effect;
pub mod engine;
pub mod models;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use buffer::queue::BufferQueue;
pub use buffer::sample_buffer::SampleBuffer;
pub use effect::delay_line::DelayLine;
pub use effect::stereo_delay::{ProcessOutcome, StereoDelay};
pub use engine::dispatch::{Dispatch, EngineMessage};
pub use engine::echo_engine::EchoEngine;
pub use engine::port::{CapturePort, PlaybackPort};
pub use models::audio_models::{
    BufferDistribution, DriverDirection, DriverInfo, EngineStatsSnapshot, MixMode, PcmFormat,
};
pub use models::config::EchoConfiguration;
pub use models::error::EchoError;
pub use models::state::EchoState;
pub use session::echo_session::EchoSession;
pub use traits::audio_driver::{CaptureDriver, PlaybackDriver};
pub use traits::echo_delegate::EchoDelegate;
