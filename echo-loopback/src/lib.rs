//! # echo-loopback
//!
//! Software loopback backend for echo-core.
//!
//! Provides:
//! - `LoopbackCapture`: a capture driver thread that synthesizes PCM from a
//!   signal source at the period cadence
//! - `LoopbackPlayback`: a playback driver thread that drains processed
//!   buffers into a sink
//! - `signal`: ready-made sources (silence, tone, fixed periods) and sinks
//!
//! ## Usage
//! ```ignore
//! use echo_core::{EchoConfiguration, EchoSession};
//! use echo_loopback::{signal, LoopbackCapture, LoopbackPlayback};
//!
//! let mut session = EchoSession::create(EchoConfiguration::default())?;
//! session.create_capture_path(LoopbackCapture::new("tone", signal::tone(440.0, 48_000, 8_000)))?;
//! session.create_playback_path(LoopbackPlayback::discarding())?;
//! session.start()?;
//! ```

pub mod loopback_capture;
pub mod loopback_playback;
pub mod pacing;
pub mod signal;

pub use loopback_capture::LoopbackCapture;
pub use loopback_playback::LoopbackPlayback;
pub use pacing::Pace;
