use crate::buffer::sample_buffer::SampleBuffer;
use crate::models::audio_models::BufferDistribution;

/// Notifications the capture and playback drivers send to the engine.
///
/// Each kind carries its own payload, so an unknown message kind cannot
/// be expressed.
#[derive(Debug)]
pub enum EngineMessage {
    /// The capture driver filled this buffer with one period of audio.
    RecordedAudioAvailable(SampleBuffer),
    /// The playback driver finished rendering this buffer.
    PlaybackComplete(SampleBuffer),
    /// Report where every pool buffer currently sits.
    RetrieveBufferCounts,
}

/// The engine's answer to an [`EngineMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Buffer queued for playback.
    Queued,
    /// Buffer returned to the free pool.
    Recycled,
    BufferCounts(BufferDistribution),
}
