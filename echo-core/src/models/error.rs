use thiserror::Error;

/// Errors reported to the control context.
///
/// Contention on the real-time path is never surfaced here; see
/// [`ProcessOutcome`](crate::effect::stereo_delay::ProcessOutcome) and
/// [`Dispatch`](crate::engine::dispatch::Dispatch) for how the audio
/// callbacks observe it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EchoError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("driver failed: {0}")]
    DriverFailed(String),
}
