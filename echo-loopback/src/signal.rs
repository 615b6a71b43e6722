//! Signal sources and sinks for the loopback drivers.
//!
//! A source fills one period of interleaved stereo samples per call; a
//! sink receives one rendered period per call.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;

/// Fills `samples` (already zeroed) with the next period of audio.
pub type SignalSource = Box<dyn FnMut(&mut [i16]) + Send + 'static>;

/// Receives each rendered period.
pub type SampleSink = Box<dyn FnMut(&[i16]) + Send + 'static>;

pub fn silence() -> SignalSource {
    Box::new(|_samples: &mut [i16]| {})
}

/// Play the given periods in order, then silence.
pub fn from_periods(periods: Vec<Vec<i16>>) -> SignalSource {
    let mut queue: VecDeque<Vec<i16>> = periods.into();
    Box::new(move |samples: &mut [i16]| {
        if let Some(period) = queue.pop_front() {
            let n = period.len().min(samples.len());
            samples[..n].copy_from_slice(&period[..n]);
        }
    })
}

/// Stereo sine tone, identical on both channels.
pub fn tone(frequency_hz: f32, sample_rate: u32, amplitude: i16) -> SignalSource {
    let step = TAU * frequency_hz / sample_rate as f32;
    let mut phase = 0.0f32;
    Box::new(move |samples: &mut [i16]| {
        for frame in samples.chunks_exact_mut(2) {
            let value = (phase.sin() * amplitude as f32) as i16;
            frame[0] = value;
            frame[1] = value;
            phase = (phase + step) % TAU;
        }
    })
}

/// A sink that appends every rendered sample to a shared vector.
pub fn collector() -> (SampleSink, Arc<Mutex<Vec<i16>>>) {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let target = Arc::clone(&collected);
    let sink: SampleSink = Box::new(move |samples: &[i16]| target.lock().extend_from_slice(samples));
    (sink, collected)
}

/// A sink that throws rendered audio away.
pub fn discard() -> SampleSink {
    Box::new(|_samples: &[i16]| {})
}
