use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::audio_models::{MixMode, PcmFormat};
use super::error::EchoError;

/// Longest delay accepted per channel, in milliseconds.
pub const MAX_DELAY_MS: u32 = 5_000;

/// Configuration for an echo session.
///
/// Every field has a default, so a JSON document only needs to name what
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfiguration {
    /// Device sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Frames delivered per driver period (default: 192).
    pub frames_per_period: u32,

    /// Interleaved channel count. Only stereo is supported.
    pub channels: u16,

    /// PCM bit depth. Only 16-bit signed PCM is supported.
    pub bit_depth: u16,

    /// Number of sample buffers in the pool (default: 4).
    pub buffer_count: usize,

    /// Minimum transfer size of the device, in bytes. Sample buffer
    /// capacity is rounded up to a multiple of this.
    pub transfer_granularity: usize,

    /// Left channel delay in milliseconds (default: 100).
    pub delay_left_ms: u32,

    /// Right channel delay in milliseconds (default: 200).
    pub delay_right_ms: u32,

    /// Echo decay ratio, 0.0–1.0 (default: 0.5). Zero disables the effect.
    pub decay_weight: f32,

    /// How delayed and live samples are combined.
    pub mix_mode: MixMode,
}

impl EchoConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.frames_per_period == 0 {
            return Err("frames per period must be positive".into());
        }
        if self.channels != 2 {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.bit_depth != 16 {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if self.buffer_count < 2 {
            return Err(format!("buffer pool too small: {}", self.buffer_count));
        }
        if self.transfer_granularity == 0 {
            return Err("transfer granularity must be positive".into());
        }
        for (side, ms) in [("left", self.delay_left_ms), ("right", self.delay_right_ms)] {
            if ms > MAX_DELAY_MS {
                return Err(format!("{side} delay {ms}ms exceeds {MAX_DELAY_MS}ms"));
            }
        }
        if !(0.0..=1.0).contains(&self.decay_weight) {
            return Err(format!("decay weight out of range: {}", self.decay_weight));
        }
        Ok(())
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth: self.bit_depth,
        }
    }

    /// Byte capacity of one sample buffer: one period of PCM, rounded up
    /// to the transfer granularity.
    pub fn buffer_bytes(&self) -> usize {
        let bits = self.frames_per_period as usize * self.channels as usize * self.bit_depth as usize;
        let bytes = (bits + 7) >> 3;
        bytes.div_ceil(self.transfer_granularity) * self.transfer_granularity
    }

    /// Byte length of one full period of PCM, before granularity rounding.
    pub fn period_bytes(&self) -> usize {
        self.frames_per_period as usize * self.format().bytes_per_frame()
    }

    pub fn from_json_str(json: &str) -> Result<Self, EchoError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EchoError::ConfigurationFailed(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(EchoError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, EchoError> {
        let json = fs::read_to_string(path)
            .map_err(|e| EchoError::ConfigurationFailed(format!("failed to read configuration: {}", e)))?;
        Self::from_json_str(&json)
    }
}

impl Default for EchoConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frames_per_period: 192,
            channels: 2,
            bit_depth: 16,
            buffer_count: 4,
            transfer_granularity: 4,
            delay_left_ms: 100,
            delay_right_ms: 200,
            decay_weight: 0.5,
            mix_mode: MixMode::Swap,
        }
    }
}
