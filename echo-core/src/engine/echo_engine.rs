use std::hint;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;

use uuid::Uuid;

use super::dispatch::{Dispatch, EngineMessage};
use super::stats::EngineStats;
use crate::buffer::queue::BufferQueue;
use crate::buffer::sample_buffer::{allocate_pool, SampleBuffer};
use crate::effect::stereo_delay::{ProcessOutcome, StereoDelay};
use crate::models::audio_models::{BufferDistribution, EngineStatsSnapshot};
use crate::models::config::EchoConfiguration;
use crate::models::error::EchoError;

/// Pipeline orchestrator for one audio session.
///
/// Owns the buffer pool (via the two queues), the delay effect and the
/// device-held counters. Shared as `Arc<EchoEngine>` between the control
/// context and the driver ports.
///
/// ```text
/// [free queue] → capture driver → RecordedAudioAvailable → [StereoDelay]
///       ↑                                                        ↓
/// PlaybackComplete ← playback driver ←──────────────── [filled queue]
/// ```
///
/// Every hand-off between holders counts the buffer at its destination
/// before removing it from its source, inside a bracket of the `moves_*`
/// counters. The diagnostic count only trusts a snapshot taken while no
/// hand-off was in flight.
#[derive(Debug)]
pub struct EchoEngine {
    id: Uuid,
    config: EchoConfiguration,
    free: BufferQueue,
    filled: BufferQueue,
    effect: StereoDelay,
    capture_held: AtomicUsize,
    playback_held: AtomicUsize,
    moves_begun: AtomicU64,
    moves_finished: AtomicU64,
    stats: EngineStats,
}

/// Spins before the diagnostic reader starts yielding.
const SETTLE_SPINS: u32 = 64;

impl EchoEngine {
    /// Allocate the pool, both queues and the effect. Every buffer starts
    /// in the free queue.
    pub fn new(config: EchoConfiguration) -> Result<Self, EchoError> {
        config.validate().map_err(EchoError::ConfigurationFailed)?;

        let effect = StereoDelay::new(
            config.format(),
            config.delay_left_ms,
            config.delay_right_ms,
            config.decay_weight,
            config.mix_mode,
        )?;

        let free = BufferQueue::new(config.buffer_count);
        let filled = BufferQueue::new(config.buffer_count);
        for buf in allocate_pool(config.buffer_count, config.buffer_bytes()) {
            if free.push(buf).is_err() {
                return Err(EchoError::AllocationFailed("free queue smaller than pool".into()));
            }
        }

        let id = Uuid::new_v4();
        log::info!(
            "echo engine {} created: {}Hz, {} frames/period, {} buffers of {} bytes, delay L={}ms R={}ms",
            id,
            config.sample_rate,
            config.frames_per_period,
            config.buffer_count,
            config.buffer_bytes(),
            config.delay_left_ms,
            config.delay_right_ms
        );

        Ok(Self {
            id,
            config,
            free,
            filled,
            effect,
            capture_held: AtomicUsize::new(0),
            playback_held: AtomicUsize::new(0),
            moves_begun: AtomicU64::new(0),
            moves_finished: AtomicU64::new(0),
            stats: EngineStats::default(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EchoConfiguration {
        &self.config
    }

    pub fn effect(&self) -> &StereoDelay {
        &self.effect
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// The single entry point drivers use to notify the engine.
    ///
    /// `RecordedAudioAvailable` hands a buffer back from the capture
    /// device and `PlaybackComplete` from the playback device; each
    /// releases that device's hold once the buffer is queued.
    pub fn dispatch(&self, message: EngineMessage) -> Dispatch {
        match message {
            EngineMessage::RecordedAudioAvailable(buf) => self.on_recorded(buf),
            EngineMessage::PlaybackComplete(buf) => self.hand_off(|| {
                let reply = self.recycle(buf);
                self.playback_held.fetch_sub(1, Ordering::SeqCst);
                reply
            }),
            EngineMessage::RetrieveBufferCounts => Dispatch::BufferCounts(self.buffer_distribution()),
        }
    }

    /// Where every buffer currently sits. Logs an error when the holders
    /// do not add up to the pool size.
    ///
    /// Waits out any hand-off in flight, so call it from the control
    /// context rather than an audio callback.
    pub fn buffer_distribution(&self) -> BufferDistribution {
        let distribution = self.settled_distribution();

        log::debug!(
            "buffer distribution: playback={}, capture={}, free={}, filled={}",
            distribution.playback_device,
            distribution.capture_device,
            distribution.free_queue,
            distribution.filled_queue
        );
        if !distribution.is_conserved() {
            log::error!(
                "lost buffers in engine {} (expected {}, found {})",
                self.id,
                distribution.total,
                distribution.accounted()
            );
        }
        distribution
    }

    /// Read the four holders while no hand-off is in flight.
    ///
    /// `finished == begun` before the reads means nothing was moving, and
    /// an unchanged `begun` after them means nothing started meanwhile.
    fn settled_distribution(&self) -> BufferDistribution {
        let mut attempts = 0u32;
        loop {
            let finished = self.moves_finished.load(Ordering::SeqCst);
            let begun = self.moves_begun.load(Ordering::SeqCst);
            if finished == begun {
                let distribution = BufferDistribution {
                    playback_device: self.playback_held.load(Ordering::SeqCst),
                    capture_device: self.capture_held.load(Ordering::SeqCst),
                    free_queue: self.free.size(),
                    filled_queue: self.filled.size(),
                    total: self.config.buffer_count,
                };
                if self.moves_begun.load(Ordering::SeqCst) == begun {
                    return distribution;
                }
            }

            attempts += 1;
            if attempts < SETTLE_SPINS {
                hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
    }

    /// Run one buffer move between holders inside the hand-off bracket.
    fn hand_off<R>(&self, move_buffer: impl FnOnce() -> R) -> R {
        self.moves_begun.fetch_add(1, Ordering::SeqCst);
        let result = move_buffer();
        self.moves_finished.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Apply the echo to a freshly captured buffer and queue it for
    /// playback. If the playback queue cannot take it the buffer goes back
    /// to the free pool instead, so it is never lost. The capture hold is
    /// released only once the buffer sits in a queue.
    fn on_recorded(&self, mut buf: SampleBuffer) -> Dispatch {
        let frame_bytes = self.config.format().bytes_per_frame();
        let frames = self.config.frames_per_period as usize;
        assert_eq!(
            buf.valid_len(),
            frames * frame_bytes,
            "capture delivered {} bytes, engine expects {} frames of {} bytes",
            buf.valid_len(),
            frames,
            frame_bytes
        );

        match self.effect.process(buf.bytes_mut(), frames) {
            ProcessOutcome::Processed => self.stats.record_processed(),
            ProcessOutcome::Bypassed => self.stats.record_bypassed(),
            ProcessOutcome::Contended => self.stats.record_contended(),
        }

        self.hand_off(|| {
            let reply = match self.filled.push(buf) {
                Ok(()) => Dispatch::Queued,
                Err(buf) => {
                    log::trace!("filled queue full, recycling buffer {}", buf.id());
                    self.stats.record_dropped_handoff();
                    self.recycle(buf)
                }
            };
            self.capture_held.fetch_sub(1, Ordering::SeqCst);
            reply
        })
    }

    fn recycle(&self, buf: SampleBuffer) -> Dispatch {
        if let Err(buf) = self.free.push(buf) {
            panic!(
                "free queue overflow on buffer {}: more buffers in flight than the pool of {}",
                buf.id(),
                self.config.buffer_count
            );
        }
        Dispatch::Recycled
    }

    pub(crate) fn take_free(&self) -> Option<SampleBuffer> {
        let buf = self.hand_off(|| take_into(&self.free, &self.capture_held));
        if buf.is_none() {
            self.stats.record_capture_overrun();
        }
        buf
    }

    pub(crate) fn take_filled(&self) -> Option<SampleBuffer> {
        let buf = self.hand_off(|| take_into(&self.filled, &self.playback_held));
        if buf.is_none() {
            self.stats.record_playback_underrun();
        }
        buf
    }

    /// Return a capture-held buffer to the free pool without recording.
    pub(crate) fn return_unrecorded(&self, buf: SampleBuffer) -> Dispatch {
        self.hand_off(|| {
            let reply = self.recycle(buf);
            self.capture_held.fetch_sub(1, Ordering::SeqCst);
            reply
        })
    }

    /// Forget one capture-held buffer, as a driver that drops a buffer
    /// instead of returning it would.
    #[cfg(test)]
    pub(crate) fn lose_capture_hold(&self) {
        self.capture_held.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pop from `queue` into a device hold, counting the hold first.
fn take_into(queue: &BufferQueue, held: &AtomicUsize) -> Option<SampleBuffer> {
    held.fetch_add(1, Ordering::SeqCst);
    let buf = queue.pop();
    if buf.is_none() {
        held.fetch_sub(1, Ordering::SeqCst);
    }
    buf
}
