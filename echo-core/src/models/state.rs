/// Echo session state machine.
///
/// State transitions:
/// ```text
/// created → running ↔ stopped
/// ```
///
/// Capture/playback paths may only be created or deleted while not running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoState {
    Created,
    Running,
    Stopped,
}

impl EchoState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}
