use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use echo_core::{EchoConfiguration, EchoSession, EchoState};
use echo_loopback::{signal, LoopbackCapture, LoopbackPlayback, Pace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type LoopbackSession = EchoSession<LoopbackCapture, LoopbackPlayback>;

const FRAMES: usize = 192;
const PERIOD_SAMPLES: usize = FRAMES * 2;

fn wait_for(counter: &AtomicU64, target: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while counter.load(Ordering::Acquire) < target {
        assert!(Instant::now() < deadline, "timed out at {} of {} periods", counter.load(Ordering::Acquire), target);
        thread::sleep(Duration::from_millis(1));
    }
}

fn session_with(
    config: EchoConfiguration,
    capture: LoopbackCapture,
    playback: LoopbackPlayback,
) -> LoopbackSession {
    let mut session = LoopbackSession::create(config).unwrap();
    session.create_capture_path(capture.with_pace(Pace::Free)).unwrap();
    session.create_playback_path(playback.with_pace(Pace::Free)).unwrap();
    session
}

#[test]
fn impulse_returns_after_each_channel_delay() {
    let mut impulse = vec![0i16; PERIOD_SAMPLES];
    impulse[20] = 1_000;
    impulse[21] = -2_000;

    let periods = 60;
    let capture = LoopbackCapture::new("impulse", signal::from_periods(vec![impulse]))
        .with_max_periods(periods);
    let (sink, collected) = signal::collector();
    let playback = LoopbackPlayback::new("collector", sink);
    let rendered = playback.rendered_counter();

    let mut session = session_with(EchoConfiguration::default(), capture, playback);
    session.start().unwrap();
    wait_for(&rendered, periods);
    session.stop().unwrap();

    let output = collected.lock().clone();
    assert_eq!(output.len(), periods as usize * PERIOD_SAMPLES);

    // 100ms and 200ms at 48kHz are 25 and 50 periods of 192 frames.
    let nonzero: Vec<(usize, i16)> = output
        .iter()
        .enumerate()
        .filter(|(_, &s)| s != 0)
        .map(|(i, &s)| (i, s))
        .collect();
    assert_eq!(
        nonzero,
        vec![(25 * PERIOD_SAMPLES + 20, 1_000), (50 * PERIOD_SAMPLES + 21, -2_000)]
    );

    let capture = session.delete_capture_path().unwrap().unwrap();
    assert_eq!(capture.delivered(), periods);
}

#[test]
fn zero_decay_renders_input_unchanged() {
    let config = EchoConfiguration { decay_weight: 0.0, ..Default::default() };
    let periods = 16;
    let capture = LoopbackCapture::new("tone", signal::tone(440.0, 48_000, 8_000)).with_max_periods(periods);
    let (sink, collected) = signal::collector();
    let playback = LoopbackPlayback::new("collector", sink);
    let rendered = playback.rendered_counter();

    let mut session = session_with(config, capture, playback);
    session.start().unwrap();
    wait_for(&rendered, periods);
    session.stop().unwrap();

    let mut reference = signal::tone(440.0, 48_000, 8_000);
    let mut expected = vec![0i16; periods as usize * PERIOD_SAMPLES];
    for period in expected.chunks_exact_mut(PERIOD_SAMPLES) {
        reference(period);
    }
    assert_eq!(*collected.lock(), expected);
    assert_eq!(session.stats().periods_bypassed, periods);
}

#[test]
fn stop_returns_every_buffer() {
    let capture = LoopbackCapture::new("tone", signal::tone(1_000.0, 48_000, 4_000));
    let playback = LoopbackPlayback::discarding();
    let rendered = playback.rendered_counter();

    let mut session = session_with(EchoConfiguration::default(), capture, playback);
    session.start().unwrap();
    assert_eq!(session.state(), EchoState::Running);
    wait_for(&rendered, 50);
    session.stop().unwrap();

    let counts = session.buffer_distribution();
    assert!(counts.is_conserved());
    assert_eq!(counts.capture_device, 0);
    assert_eq!(counts.playback_device, 0);
    assert_eq!(counts.free_queue + counts.filled_queue, 4);
}

#[test]
fn distribution_is_conserved_on_every_reading_while_running() {
    let capture = LoopbackCapture::new("tone", signal::tone(1_000.0, 48_000, 4_000));
    let playback = LoopbackPlayback::discarding();
    let rendered = playback.rendered_counter();

    let mut session = session_with(EchoConfiguration::default(), capture, playback);
    session.start().unwrap();

    let deadline = Instant::now() + Duration::from_millis(300);
    let mut readings = 0u64;
    while Instant::now() < deadline {
        let counts = session.engine().buffer_distribution();
        assert!(counts.is_conserved(), "reading {}: {:?}", readings, counts);
        readings += 1;
    }
    wait_for(&rendered, 1);
    session.stop().unwrap();

    assert!(readings > 0);
    assert!(session.buffer_distribution().is_conserved());
}

#[test]
fn restart_after_stop() {
    let capture = LoopbackCapture::new("tone", signal::tone(1_000.0, 48_000, 4_000));
    let playback = LoopbackPlayback::discarding();
    let rendered = playback.rendered_counter();

    let mut session = session_with(EchoConfiguration::default(), capture, playback);
    session.start().unwrap();
    wait_for(&rendered, 10);
    session.stop().unwrap();

    session.start().unwrap();
    wait_for(&rendered, 20);
    session.stop().unwrap();
    assert!(session.buffer_distribution().is_conserved());
}

#[test]
fn reconfiguring_while_running_keeps_the_pipeline_flowing() {
    let capture = LoopbackCapture::new("tone", signal::tone(440.0, 48_000, 8_000));
    let playback = LoopbackPlayback::discarding();
    let rendered = playback.rendered_counter();

    let mut session = session_with(EchoConfiguration::default(), capture, playback);
    session.start().unwrap();

    for seed in 0..4u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..10 {
            let left = rng.gen_range(1..=500);
            let right = rng.gen_range(1..=500);
            session.configure_delay(left, right).unwrap();
            assert_eq!(session.engine().effect().delay_time(), (left, right));
            session.set_decay_weight(rng.gen_range(0.0..=1.0));
            thread::yield_now();
        }
    }

    let before = rendered.load(Ordering::Acquire);
    wait_for(&rendered, before + 20);
    session.stop().unwrap();

    let counts = session.buffer_distribution();
    assert!(counts.is_conserved());
    let stats = session.stats();
    assert!(stats.periods_processed + stats.periods_bypassed + stats.periods_contended >= before + 20);
}

#[test]
fn dropping_a_running_session_joins_driver_threads() {
    let capture = LoopbackCapture::new("tone", signal::tone(440.0, 48_000, 8_000));
    let playback = LoopbackPlayback::discarding();
    let rendered = playback.rendered_counter();

    let mut session = session_with(EchoConfiguration::default(), capture, playback);
    session.start().unwrap();
    wait_for(&rendered, 10);
    drop(session);

    let after_drop = rendered.load(Ordering::Acquire);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(rendered.load(Ordering::Acquire), after_drop);
}

#[test]
fn real_time_pace_renders_at_the_period_rate() {
    let capture = LoopbackCapture::silent();
    let playback = LoopbackPlayback::discarding();
    let rendered = playback.rendered_counter();

    let mut session = LoopbackSession::create(EchoConfiguration::default()).unwrap();
    session.create_capture_path(capture).unwrap();
    session.create_playback_path(playback).unwrap();

    let started = Instant::now();
    session.start().unwrap();
    wait_for(&rendered, 5);
    session.stop().unwrap();

    // Five 4ms periods cannot be rendered faster than real time allows.
    assert!(started.elapsed() >= Duration::from_millis(12));
}

#[test]
fn paths_are_locked_while_running() {
    let mut session = session_with(
        EchoConfiguration::default(),
        LoopbackCapture::silent(),
        LoopbackPlayback::discarding(),
    );
    session.start().unwrap();

    assert!(session.create_capture_path(LoopbackCapture::silent()).is_err());
    assert!(session.delete_playback_path().is_err());

    session.stop().unwrap();
    let playback = session.delete_playback_path().unwrap().unwrap();
    assert!(playback.underruns() + playback.rendered() > 0);
}

#[test]
fn loopback_drivers_describe_themselves() {
    use echo_core::{CaptureDriver, DriverDirection, PlaybackDriver};

    let capture = LoopbackCapture::silent();
    let playback = LoopbackPlayback::discarding();
    assert_eq!(capture.device_info().id, "loopback-in");
    assert_eq!(capture.device_info().direction, DriverDirection::Capture);
    assert_eq!(playback.device_info().id, "loopback-out");
    assert_eq!(playback.device_info().direction, DriverDirection::Playback);
    assert!(!capture.is_running());
}
