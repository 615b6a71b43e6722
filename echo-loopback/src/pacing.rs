use std::thread;
use std::time::Duration;

/// How a loopback driver thread spaces its periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pace {
    /// Sleep one period between callbacks, like a real device.
    #[default]
    RealTime,
    /// Run periods back to back, yielding in between. For tests and
    /// offline rendering.
    Free,
}

impl Pace {
    pub(crate) fn wait(&self, period: Duration) {
        match self {
            Self::RealTime => thread::sleep(period),
            Self::Free => thread::yield_now(),
        }
    }
}

/// Wall-clock length of one period.
pub fn period_duration(frames_per_period: usize, sample_rate: u32) -> Duration {
    Duration::from_micros(frames_per_period as u64 * 1_000_000 / sample_rate.max(1) as u64)
}
