use crate::models::audio_models::PcmFormat;
use crate::models::error::EchoError;

const MS_PER_SEC: u64 = 1000;

/// Byte size reserved for a delay of `delay_ms` at `format`.
///
/// `round(delay_ms / 1000 * sample_rate)` frames, times the channel count,
/// times the sample width, rounded up to a whole frame.
pub fn delay_line_bytes(delay_ms: u32, format: &PcmFormat) -> usize {
    let frames = (delay_ms as u64 * format.sample_rate as u64 + MS_PER_SEC / 2) / MS_PER_SEC;
    let sample_count = frames as usize * format.channels as usize;
    let bytes = sample_count * format.bytes_per_sample();
    let frame_bytes = format.bytes_per_frame();
    bytes.div_ceil(frame_bytes) * frame_bytes
}

/// Frame capacity for a delay of `delay_ms` at `format`.
pub fn delay_line_frames(delay_ms: u32, format: &PcmFormat) -> usize {
    delay_line_bytes(delay_ms, format) / format.bytes_per_frame()
}

/// One channel's circular history of 16-bit samples.
///
/// Holds exactly one sample per frame of delay; the stereo effect owns one
/// line per channel so neither channel's echo can leak into the other.
#[derive(Debug)]
pub struct DelayLine {
    delay_ms: u32,
    samples: Vec<i16>,
    cursor: usize,
}

impl DelayLine {
    /// Allocate a zeroed (silent) line for `delay_ms`.
    ///
    /// Allocation is fallible so a huge delay is reported instead of
    /// aborting the process.
    pub fn new(delay_ms: u32, format: &PcmFormat) -> Result<Self, EchoError> {
        let frames = delay_line_frames(delay_ms, format);
        let mut samples = Vec::new();
        samples.try_reserve_exact(frames).map_err(|e| {
            EchoError::AllocationFailed(format!("{}ms delay line ({} frames): {}", delay_ms, frames, e))
        })?;
        samples.resize(frames, 0);

        Ok(Self {
            delay_ms,
            samples,
            cursor: 0,
        })
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn frame_capacity(&self) -> usize {
        self.samples.len()
    }

    /// Current frame position, always in `[0, frame_capacity)` (or 0 for an
    /// empty line).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Position the cursor for a block of `frame_count` frames.
    ///
    /// If the block would run past the end the cursor restarts at 0 instead
    /// of wrapping the remainder, so the tail of the line is skipped for
    /// that pass.
    pub(crate) fn prepare(&mut self, frame_count: usize) {
        if self.cursor + frame_count > self.samples.len() {
            self.cursor = 0;
        }
    }

    /// The `frame_count` slots starting at the cursor. Call
    /// [`prepare`](Self::prepare) first.
    pub(crate) fn window_mut(&mut self, frame_count: usize) -> &mut [i16] {
        &mut self.samples[self.cursor..self.cursor + frame_count]
    }

    pub(crate) fn advance(&mut self, frame_count: usize) {
        self.cursor += frame_count;
        if self.cursor >= self.samples.len() {
            self.cursor = 0;
        }
    }

    #[cfg(test)]
    pub(crate) fn samples(&self) -> &[i16] {
        &self.samples
    }
}
