use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::audio_models::EngineStatsSnapshot;

/// Real-time path counters. Updated with relaxed atomics from the audio
/// callbacks and read by the control context.
#[derive(Debug, Default)]
pub struct EngineStats {
    periods_processed: AtomicU64,
    periods_bypassed: AtomicU64,
    periods_contended: AtomicU64,
    capture_overruns: AtomicU64,
    playback_underruns: AtomicU64,
    dropped_handoffs: AtomicU64,
}

impl EngineStats {
    pub(crate) fn record_processed(&self) {
        self.periods_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bypassed(&self) {
        self.periods_bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_contended(&self) {
        self.periods_contended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_capture_overrun(&self) {
        self.capture_overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_playback_underrun(&self) {
        self.playback_underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_handoff(&self) {
        self.dropped_handoffs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            periods_processed: self.periods_processed.load(Ordering::Relaxed),
            periods_bypassed: self.periods_bypassed.load(Ordering::Relaxed),
            periods_contended: self.periods_contended.load(Ordering::Relaxed),
            capture_overruns: self.capture_overruns.load(Ordering::Relaxed),
            playback_underruns: self.playback_underruns.load(Ordering::Relaxed),
            dropped_handoffs: self.dropped_handoffs.load(Ordering::Relaxed),
        }
    }
}
