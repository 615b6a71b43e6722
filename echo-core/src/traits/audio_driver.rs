use crate::engine::port::{CapturePort, PlaybackPort};
use crate::models::audio_models::DriverInfo;
use crate::models::error::EchoError;

/// An audio input binding that fills pool buffers once per period.
///
/// Implemented by platform backends and by `echo-loopback`. The driver
/// owns its callback context; `start` hands it the port it uses to draw
/// empty buffers and submit recorded ones.
pub trait CaptureDriver: Send {
    /// Whether the underlying device can currently be opened.
    fn is_available(&self) -> bool;

    /// Begin delivering periods through `port`.
    ///
    /// The callback context must never block: when `port.acquire()` has
    /// nothing to offer, skip the period.
    fn start(&mut self, port: CapturePort) -> Result<(), EchoError>;

    /// Stop the callback context.
    ///
    /// Must not return until the context has fully exited and every buffer
    /// it held has been submitted or abandoned back to the port.
    fn stop(&mut self) -> Result<(), EchoError>;

    fn device_info(&self) -> DriverInfo;
}

/// An audio output binding that renders processed buffers once per period.
pub trait PlaybackDriver: Send {
    fn is_available(&self) -> bool;

    /// Begin rendering buffers drawn from `port`. When nothing is queued
    /// the driver renders silence for that period.
    fn start(&mut self, port: PlaybackPort) -> Result<(), EchoError>;

    /// Stop the callback context. Same contract as [`CaptureDriver::stop`]:
    /// every held buffer is released before this returns.
    fn stop(&mut self) -> Result<(), EchoError>;

    fn device_info(&self) -> DriverInfo;
}
