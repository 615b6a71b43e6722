use serde::{Deserialize, Serialize};

/// Interleaved PCM stream format shared by drivers, buffers and the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl PcmFormat {
    pub fn bytes_per_sample(&self) -> usize {
        self.bit_depth as usize / 8
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.bytes_per_sample()
    }
}

/// How the delay effect combines the live signal with the delayed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixMode {
    /// Output the stored echo and store the live sample (pure delay).
    #[default]
    Swap,
    /// Blend live and delayed samples with the fixed-point decay weights
    /// and feed the blend back into the delay line.
    Weighted,
}

/// Direction of a driver binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverDirection {
    Capture,
    Playback,
}

/// Identifies the device behind a capture or playback driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub id: String,
    pub name: String,
    pub direction: DriverDirection,
}

/// Where every pool buffer currently sits.
///
/// In a healthy pipeline the four holders always add up to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDistribution {
    pub playback_device: usize,
    pub capture_device: usize,
    pub free_queue: usize,
    pub filled_queue: usize,
    pub total: usize,
}

impl BufferDistribution {
    pub fn accounted(&self) -> usize {
        self.playback_device + self.capture_device + self.free_queue + self.filled_queue
    }

    pub fn is_conserved(&self) -> bool {
        self.accounted() == self.total
    }
}

/// Diagnostics for the real-time path, copied out of the atomic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatsSnapshot {
    pub periods_processed: u64,
    pub periods_bypassed: u64,
    pub periods_contended: u64,
    pub capture_overruns: u64,
    pub playback_underruns: u64,
    pub dropped_handoffs: u64,
}
