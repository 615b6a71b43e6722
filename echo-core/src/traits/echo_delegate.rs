use crate::models::audio_models::BufferDistribution;
use crate::models::error::EchoError;
use crate::models::state::EchoState;

/// Event delegate for echo session notifications.
///
/// Called from the control context. Implementations should marshal to a
/// UI thread themselves if needed.
pub trait EchoDelegate: Send + Sync {
    fn on_state_changed(&self, state: EchoState);

    /// A control operation or driver failed.
    fn on_error(&self, error: &EchoError);

    /// The buffer-count diagnostic found fewer (or more) buffers than the
    /// pool was created with.
    fn on_buffers_lost(&self, distribution: &BufferDistribution);
}
