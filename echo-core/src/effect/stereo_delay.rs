//! Stereo feedback delay operating on interleaved 16-bit PCM in place.
//!
//! The hot path is integer only. Decay weighting uses a fixed-point pair
//! that always sums to [`UNITY`]:
//!
//! ```text
//! out = (live * live_factor + delayed * feedback_factor) / UNITY
//! ```

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use parking_lot::Mutex;

use super::delay_line::DelayLine;
use crate::models::audio_models::{MixMode, PcmFormat};
use crate::models::error::EchoError;

/// Fixed-point scale for the decay ratio.
pub const UNITY: i32 = 128;

const LEFT: usize = 0;
const RIGHT: usize = 1;

/// What `process` did with a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The block now carries the echo.
    Processed,
    /// Effect disabled for this configuration (zero decay, or a delay
    /// shorter than the block). The block is untouched.
    Bypassed,
    /// A reconfiguration held the lock. The block is untouched.
    Contended,
}

#[derive(Debug)]
struct DelayLines {
    left: DelayLine,
    right: DelayLine,
}

/// Two independent delay lines, one per stereo channel.
///
/// Shared between the control context (reconfiguration) and the capture
/// callback (processing): `set_delay_time` takes the structural lock,
/// `process` only ever tries it.
#[derive(Debug)]
pub struct StereoDelay {
    format: PcmFormat,
    mix_mode: MixMode,
    /// Decay ratio as `f32` bits, for reporting.
    decay_bits: AtomicU32,
    /// Live weight is always `UNITY - feedback_factor`, so one load
    /// gives a consistent pair.
    feedback_factor: AtomicI32,
    lines: Mutex<DelayLines>,
}

impl StereoDelay {
    pub fn new(
        format: PcmFormat,
        delay_left_ms: u32,
        delay_right_ms: u32,
        decay_weight: f32,
        mix_mode: MixMode,
    ) -> Result<Self, EchoError> {
        if format.channels != 2 || format.bit_depth != 16 {
            return Err(EchoError::ConfigurationFailed(format!(
                "stereo delay needs 2ch/16-bit PCM, got {}ch/{}-bit",
                format.channels, format.bit_depth
            )));
        }

        let lines = DelayLines {
            left: DelayLine::new(delay_left_ms, &format)?,
            right: DelayLine::new(delay_right_ms, &format)?,
        };

        let effect = Self {
            format,
            mix_mode,
            decay_bits: AtomicU32::new(0),
            feedback_factor: AtomicI32::new(0),
            lines: Mutex::new(lines),
        };
        effect.set_decay_weight(decay_weight);
        Ok(effect)
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn mix_mode(&self) -> MixMode {
        self.mix_mode
    }

    /// Change both delay times, reallocating and silencing the lines.
    ///
    /// A no-op if neither time changed. Blocks on the structural lock, so it
    /// must only be called from the control context.
    pub fn set_delay_time(&self, left_ms: u32, right_ms: u32) -> Result<(), EchoError> {
        let mut lines = self.lines.lock();
        if lines.left.delay_ms() == left_ms && lines.right.delay_ms() == right_ms {
            return Ok(());
        }

        // Build both before swapping so a failed allocation leaves the
        // previous configuration running.
        let left = DelayLine::new(left_ms, &self.format)?;
        let right = DelayLine::new(right_ms, &self.format)?;
        *lines = DelayLines { left, right };

        log::debug!(
            "delay lines reallocated: L={}ms ({} frames), R={}ms ({} frames)",
            left_ms,
            lines.left.frame_capacity(),
            right_ms,
            lines.right.frame_capacity()
        );
        Ok(())
    }

    /// Current `(left_ms, right_ms)`.
    pub fn delay_time(&self) -> (u32, u32) {
        let lines = self.lines.lock();
        (lines.left.delay_ms(), lines.right.delay_ms())
    }

    /// Frame capacities `(left, right)`.
    pub fn frame_capacity(&self) -> (usize, usize) {
        let lines = self.lines.lock();
        (lines.left.frame_capacity(), lines.right.frame_capacity())
    }

    /// Write cursors `(left, right)`.
    pub fn cursors(&self) -> (usize, usize) {
        let lines = self.lines.lock();
        (lines.left.cursor(), lines.right.cursor())
    }

    /// Set the decay ratio (clamped to 0.0–1.0). Zero disables the effect.
    ///
    /// Lock-free, so it is safe to call while audio is running.
    pub fn set_decay_weight(&self, weight: f32) {
        let weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
        let feedback = (weight * UNITY as f32) as i32;

        self.decay_bits.store(weight.to_bits(), Ordering::Relaxed);
        self.feedback_factor.store(feedback, Ordering::Release);
    }

    pub fn decay_weight(&self) -> f32 {
        f32::from_bits(self.decay_bits.load(Ordering::Relaxed))
    }

    /// Fixed-point `(feedback, live)` weights. They always sum to [`UNITY`].
    pub fn factors(&self) -> (i32, i32) {
        let feedback = self.feedback_factor.load(Ordering::Acquire);
        (feedback, UNITY - feedback)
    }

    /// Apply the echo to `frame_count` interleaved stereo frames of
    /// little-endian PCM in `pcm`, in place.
    ///
    /// Never blocks: if a reconfiguration holds the lock the block is
    /// passed through untouched and [`ProcessOutcome::Contended`] is
    /// returned.
    ///
    /// # Panics
    /// If `pcm` holds fewer than `frame_count` frames.
    pub fn process(&self, pcm: &mut [u8], frame_count: usize) -> ProcessOutcome {
        let frame_bytes = self.format.bytes_per_frame();
        assert!(
            pcm.len() >= frame_count * frame_bytes,
            "{} bytes cannot hold {} frames",
            pcm.len(),
            frame_count
        );

        let feedback = self.feedback_factor.load(Ordering::Acquire);
        if feedback == 0 || frame_count == 0 {
            return ProcessOutcome::Bypassed;
        }

        let Some(mut lines) = self.lines.try_lock() else {
            log::trace!("delay reconfiguration in progress, passing block through");
            return ProcessOutcome::Contended;
        };

        if lines.left.frame_capacity() < frame_count || lines.right.frame_capacity() < frame_count {
            return ProcessOutcome::Bypassed;
        }

        let live_factor = UNITY - feedback;
        let DelayLines { left, right } = &mut *lines;
        left.prepare(frame_count);
        right.prepare(frame_count);

        let channels = [left.window_mut(frame_count), right.window_mut(frame_count)];
        let frames = pcm[..frame_count * frame_bytes].chunks_exact_mut(frame_bytes);
        for (frame_index, frame) in frames.enumerate() {
            for (channel, bytes) in [LEFT, RIGHT].into_iter().zip(frame.chunks_exact_mut(2)) {
                let slot = &mut channels[channel][frame_index];
                let live = i16::from_le_bytes([bytes[0], bytes[1]]);
                let delayed = *slot;

                let (output, stored) = match self.mix_mode {
                    MixMode::Swap => (delayed, live),
                    MixMode::Weighted => {
                        let mixed = mix(live, delayed, live_factor, feedback);
                        (mixed, mixed)
                    }
                };

                bytes.copy_from_slice(&output.to_le_bytes());
                *slot = stored;
            }
        }

        left.advance(frame_count);
        right.advance(frame_count);
        ProcessOutcome::Processed
    }
}

fn mix(live: i16, delayed: i16, live_factor: i32, feedback_factor: i32) -> i16 {
    let blended = (live as i32 * live_factor + delayed as i32 * feedback_factor) / UNITY;
    blended.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const FORMAT: PcmFormat = PcmFormat {
        sample_rate: 48_000,
        channels: 2,
        bit_depth: 16,
    };

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn decode(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    /// 1kHz rate so a delay of N ms is exactly N frames.
    fn small(left_ms: u32, right_ms: u32, mode: MixMode) -> StereoDelay {
        let format = PcmFormat { sample_rate: 1_000, ..FORMAT };
        StereoDelay::new(format, left_ms, right_ms, 0.5, mode).unwrap()
    }

    #[test]
    fn factors_are_complementary() {
        let effect = StereoDelay::new(FORMAT, 100, 200, 0.5, MixMode::Swap).unwrap();
        assert_eq!(effect.factors(), (64, 64));

        effect.set_decay_weight(0.25);
        assert_eq!(effect.factors(), (32, 96));
        assert_relative_eq!(effect.decay_weight(), 0.25);

        effect.set_decay_weight(3.0);
        assert_eq!(effect.factors(), (UNITY, 0));
        assert_relative_eq!(effect.decay_weight(), 1.0);
    }

    #[test]
    fn rejects_non_stereo_formats() {
        let mono = PcmFormat { channels: 1, ..FORMAT };
        assert!(StereoDelay::new(mono, 100, 100, 0.5, MixMode::Swap).is_err());
    }

    #[test]
    fn zero_decay_leaves_block_untouched() {
        let effect = StereoDelay::new(FORMAT, 100, 100, 0.0, MixMode::Swap).unwrap();
        let original = pcm(&[1, -1, 2, -2, 3, -3]);
        let mut block = original.clone();

        assert_eq!(effect.process(&mut block, 3), ProcessOutcome::Bypassed);
        assert_eq!(block, original);
        assert_eq!(effect.cursors(), (0, 0));
    }

    #[test]
    fn block_longer_than_delay_is_bypassed() {
        let effect = small(4, 8, MixMode::Swap);
        let original = pcm(&[7; 12]); // 6 frames > 4-frame left line
        let mut block = original.clone();

        assert_eq!(effect.process(&mut block, 6), ProcessOutcome::Bypassed);
        assert_eq!(block, original);
        assert_eq!(effect.cursors(), (0, 0));
    }

    #[test]
    fn swap_outputs_previous_pass_and_keeps_channels_apart() {
        let effect = small(2, 2, MixMode::Swap);

        let mut first = pcm(&[10, -10, 20, -20]);
        assert_eq!(effect.process(&mut first, 2), ProcessOutcome::Processed);
        assert_eq!(decode(&first), vec![0, 0, 0, 0]);

        let mut second = pcm(&[0, 0, 0, 0]);
        effect.process(&mut second, 2);
        assert_eq!(decode(&second), vec![10, -10, 20, -20]);

        let lines = effect.lines.lock();
        assert_eq!(lines.left.samples(), &[0, 0]);
        assert_eq!(lines.right.samples(), &[0, 0]);
    }

    #[test]
    fn left_only_input_never_reaches_right_echo() {
        let effect = small(3, 5, MixMode::Swap);

        for _ in 0..10 {
            let mut block = pcm(&[1000, 0]);
            effect.process(&mut block, 1);
            let out = decode(&block);
            assert_eq!(out[1], 0, "left audio leaked into the right echo");
        }

        let lines = effect.lines.lock();
        assert!(lines.right.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn channels_use_independent_delays() {
        // L = 2 frames, R = 3 frames, one frame per block.
        let effect = small(2, 3, MixMode::Swap);
        let mut outputs = Vec::new();
        for n in 1..=6i16 {
            let mut block = pcm(&[n, -n]);
            effect.process(&mut block, 1);
            outputs.push(decode(&block));
        }

        let left: Vec<i16> = outputs.iter().map(|f| f[0]).collect();
        let right: Vec<i16> = outputs.iter().map(|f| f[1]).collect();
        assert_eq!(left, vec![0, 0, 1, 2, 3, 4]);
        assert_eq!(right, vec![0, 0, 0, -1, -2, -3]);
    }

    #[test]
    fn cursor_resets_when_block_does_not_fit() {
        // 5-frame line, 2-frame blocks: positions 0, 2, then 4+2 > 5 -> 0.
        let effect = small(5, 5, MixMode::Swap);
        let mut block = pcm(&[1, 1, 1, 1]);
        effect.process(&mut block, 2);
        effect.process(&mut block, 2);
        assert_eq!(effect.cursors(), (4, 4));

        let mut marker = pcm(&[9, 9, 9, 9]);
        effect.process(&mut marker, 2);
        // Read back from slot 0 (first block's input), not slot 4.
        assert_eq!(decode(&marker), vec![1, 1, 1, 1]);
        assert_eq!(effect.cursors(), (2, 2));
    }

    #[test]
    fn contended_lock_passes_block_through() {
        let effect = small(4, 4, MixMode::Swap);
        let original = pcm(&[5, 6, 7, 8]);
        let mut block = original.clone();

        let guard = effect.lines.lock();
        assert_eq!(effect.process(&mut block, 2), ProcessOutcome::Contended);
        drop(guard);

        assert_eq!(block, original);
        assert_eq!(effect.cursors(), (0, 0));
    }

    #[test]
    fn unchanged_delay_time_is_a_no_op() {
        let effect = small(4, 4, MixMode::Swap);
        let mut block = pcm(&[3, 4, 5, 6]);
        effect.process(&mut block, 2);
        let cursors = effect.cursors();

        assert!(effect.set_delay_time(4, 4).is_ok());
        assert_eq!(effect.cursors(), cursors);

        // Advance through the rest of the line; the stored block survives.
        let mut filler = pcm(&[0, 0, 0, 0]);
        effect.process(&mut filler, 2);
        let mut next = pcm(&[0, 0, 0, 0]);
        effect.process(&mut next, 2);
        assert_eq!(decode(&next), vec![3, 4, 5, 6]);
    }

    #[test]
    fn reconfiguration_silences_and_resets() {
        let effect = small(4, 4, MixMode::Swap);
        let mut block = pcm(&[3, 4, 5, 6]);
        effect.process(&mut block, 2);

        effect.set_delay_time(6, 2).unwrap();
        assert_eq!(effect.delay_time(), (6, 2));
        assert_eq!(effect.frame_capacity(), (6, 2));
        assert_eq!(effect.cursors(), (0, 0));

        let lines = effect.lines.lock();
        assert!(lines.left.samples().iter().all(|&s| s == 0));
        assert!(lines.right.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn weighted_mix_repeats_with_decay() {
        // One-frame delay: each block echoes the previous output.
        let effect = small(1, 1, MixMode::Weighted);

        let mut block = pcm(&[1024, -1024]);
        effect.process(&mut block, 1);
        // 1024 * 64 / 128 + 0 * 64 / 128
        assert_eq!(decode(&block), vec![512, -512]);

        let mut block = pcm(&[0, 0]);
        effect.process(&mut block, 1);
        assert_eq!(decode(&block), vec![256, -256]);

        let mut block = pcm(&[0, 0]);
        effect.process(&mut block, 1);
        assert_eq!(decode(&block), vec![128, -128]);
    }

    #[test]
    fn weighted_mix_uses_complementary_live_weight() {
        let effect = small(1, 1, MixMode::Weighted);
        effect.set_decay_weight(0.25);

        let mut block = pcm(&[1024, 1024]);
        effect.process(&mut block, 1);
        // 1024 * 96 / 128
        assert_eq!(decode(&block), vec![768, 768]);

        let mut block = pcm(&[0, 0]);
        effect.process(&mut block, 1);
        // 768 * 32 / 128
        assert_eq!(decode(&block), vec![192, 192]);
    }

    #[test]
    fn weight_changes_never_tear_the_mix() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;
        use std::thread;

        // With live == stored the blend is exact only if the two weights
        // sum to UNITY.
        let effect = Arc::new(small(1, 1, MixMode::Weighted));
        {
            let mut lines = effect.lines.lock();
            lines.left.window_mut(1)[0] = 1024;
            lines.right.window_mut(1)[0] = 1024;
        }

        let done = Arc::new(AtomicBool::new(false));
        let flipper = {
            let effect = Arc::clone(&effect);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut high = false;
                while !done.load(Ordering::Relaxed) {
                    effect.set_decay_weight(if high { 0.75 } else { 0.25 });
                    high = !high;
                }
            })
        };

        for _ in 0..20_000 {
            let mut block = pcm(&[1024, 1024]);
            assert_eq!(effect.process(&mut block, 1), ProcessOutcome::Processed);
            assert_eq!(decode(&block), vec![1024, 1024]);
        }

        done.store(true, Ordering::Relaxed);
        flipper.join().unwrap();
    }

    #[test]
    fn weighted_mix_stays_in_range() {
        assert_eq!(mix(i16::MAX, i16::MAX, 64, 64), i16::MAX);
        assert_eq!(mix(i16::MIN, i16::MIN, 64, 64), i16::MIN);
        assert_eq!(mix(i16::MAX, i16::MIN, 64, 64), 0);
    }

    #[test]
    #[should_panic(expected = "cannot hold")]
    fn short_block_panics() {
        let effect = small(4, 4, MixMode::Swap);
        let mut block = vec![0u8; 6];
        effect.process(&mut block, 2);
    }
}
