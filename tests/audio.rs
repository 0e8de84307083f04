use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use approx::assert_abs_diff_eq;
use taktgeber::nodes::{GainMessage, PulseMessage, ScopeMessage, SineMessage};
use taktgeber::{onset_delay, AudioEngine, AudioPath, BeatSignal, ClockSource, Config, Waveform, BLOCK_SIZE};

const SR: u32 = 48_000;

fn engine() -> (AudioEngine, AudioPath) {
    let (engine, path) = AudioEngine::new(SR, &Config::default());
    engine.clock().resume().unwrap();
    (engine, path)
}

fn render(path: &mut AudioPath, frames: usize) -> Vec<f32> {
    let mut data = vec![0.0; frames];
    path.render_mono(&mut data);
    data
}

/// Open the tone gate and set its gain, as a tone start does.
fn open_tone(engine: &mut AudioEngine, gain: f32) {
    engine.tone_gate().store(true, Ordering::Release);
    engine.tone_gain().send(GainMessage::SetGain(gain)).unwrap();
}

fn first_audible(samples: &[f32]) -> Option<usize> {
    samples.iter().position(|s| s.abs() > 1e-6)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0, |m, s| m.max(s.abs()))
}

#[test]
fn suspended_clock_renders_silence_and_stays_put() {
    let (mut engine, mut path) = AudioEngine::new(SR, &Config::default());
    engine.pulse().send(PulseMessage::Trigger { at: 0.0, gain: 1.0 }).unwrap();

    let out = render(&mut path, 4800);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(engine.clock().frames(), 0);

    engine.clock().resume().unwrap();
    let out = render(&mut path, 4800);
    assert!(first_audible(&out).is_some());
    assert_eq!(engine.clock().frames(), 4800);
    assert_abs_diff_eq!(engine.clock().current_time(), 0.1);
}

#[test]
fn pulse_starts_on_its_exact_frame() {
    let (mut engine, mut path) = engine();
    engine.pulse().send(PulseMessage::Trigger { at: 0.05, gain: 0.5 }).unwrap();

    let out = render(&mut path, 9600);
    let onset = (0.05 * SR as f64).round() as usize;

    // The envelope starts at zero, so the first audible sample follows the onset frame
    let first = first_audible(&out).unwrap();
    assert!(first >= onset && first <= onset + 2, "first audible sample at {first}");

    // 50 ms burst, then silence again
    let end = onset + (0.05 * SR as f64) as usize;
    assert!(peak(&out[onset..end]) > 0.4);
    assert_eq!(peak(&out[end + 1..]), 0.0);
}

#[test]
fn pulse_gain_is_fixed_at_commit() {
    let (mut engine, mut path) = engine();
    engine.pulse().send(PulseMessage::Trigger { at: 0.01, gain: 0.2 }).unwrap();

    let out = render(&mut path, 4800);
    let loudest = peak(&out);
    assert!(loudest > 0.15 && loudest <= 0.2 + 1e-6, "peak was {loudest}");
}

#[test]
fn late_pulse_starts_immediately() {
    let (mut engine, mut path) = engine();
    render(&mut path, 4800);

    engine.pulse().send(PulseMessage::Trigger { at: 0.02, gain: 1.0 }).unwrap();
    let out = render(&mut path, 4800);
    let first = first_audible(&out).unwrap();
    assert!(first < BLOCK_SIZE);
}

#[test]
fn triggers_beyond_the_pending_limit_are_counted() {
    let (mut engine, mut path) = engine();

    // 64 bursts may wait at once; all of these are far in the future
    for i in 0..64 {
        engine.pulse().send(PulseMessage::Trigger { at: 10.0 + i as f64 * 0.1, gain: 0.5 }).unwrap();
    }
    render(&mut path, BLOCK_SIZE);
    assert_eq!(engine.dropped_pulses(), 0);

    for i in 0..10 {
        engine.pulse().send(PulseMessage::Trigger { at: 20.0 + i as f64 * 0.1, gain: 0.5 }).unwrap();
    }
    render(&mut path, BLOCK_SIZE);
    assert_eq!(engine.dropped_pulses(), 10);
}

#[test]
fn armed_beat_signal_records_onsets() {
    let (mut engine, mut path) = engine();
    engine.beat().arm();

    let before = Instant::now();
    engine.pulse().send(PulseMessage::Trigger { at: 0.05, gain: 0.5 }).unwrap();
    render(&mut path, 4800);

    let beat = engine.beat().last_beat().unwrap();
    assert!(beat >= before);
    assert_abs_diff_eq!(engine.beat().decay(beat, Duration::from_millis(200)), 1.0);
}

#[test]
fn disarmed_beat_signal_drops_onsets() {
    let (mut engine, mut path) = engine();
    engine.beat().arm();
    engine.pulse().send(PulseMessage::Trigger { at: 0.01, gain: 0.5 }).unwrap();
    render(&mut path, 2400);
    assert!(engine.beat().last_beat().is_some());

    // A pulse already in flight when playback stops
    engine.pulse().send(PulseMessage::Trigger { at: 0.1, gain: 0.5 }).unwrap();
    engine.beat().disarm();
    let out = render(&mut path, 4800);

    assert!(first_audible(&out).is_some());
    assert!(engine.beat().last_beat().is_none());
}

#[test]
fn beat_decay_fades_linearly() {
    let beat = BeatSignal::new();
    let window = Duration::from_millis(200);
    let now = Instant::now();
    assert_eq!(beat.decay(now, window), 0.0);

    beat.arm();
    assert!(beat.mark(now));
    assert_abs_diff_eq!(beat.decay(now + Duration::from_millis(100), window), 0.5, epsilon = 1e-3);
    assert_eq!(beat.decay(now + Duration::from_millis(300), window), 0.0);

    beat.disarm();
    assert!(!beat.mark(now));
    assert!(beat.last_beat().is_none());
}

#[test]
fn onset_delay_clamps_past_events() {
    assert_eq!(onset_delay(1.0, 2.0), Duration::ZERO);
    assert_eq!(onset_delay(f64::NAN, 0.0), Duration::ZERO);
    let delay = onset_delay(1.25, 1.0);
    assert_abs_diff_eq!(delay.as_secs_f64(), 0.25, epsilon = 1e-9);
}

#[test]
fn tone_is_silent_until_gain_opens() {
    let (mut engine, mut path) = engine();
    let out = render(&mut path, 2048);
    assert_eq!(peak(&out), 0.0);

    open_tone(&mut engine, 0.5);
    let out = render(&mut path, BLOCK_SIZE);
    assert!(peak(&out) > 0.01);
}

#[test]
fn closed_gate_mutes_tone_whatever_the_gain() {
    let (mut engine, mut path) = engine();
    engine.tone_gain().send(GainMessage::SetGain(0.5)).unwrap();
    let out = render(&mut path, BLOCK_SIZE * 8);
    assert_eq!(peak(&out), 0.0);

    engine.tone_gate().store(true, Ordering::Release);
    let out = render(&mut path, BLOCK_SIZE * 8);
    assert!(peak(&out) > 0.01);

    // Closing ramps down without any message on the gain queue
    engine.tone_gate().store(false, Ordering::Release);
    let out = render(&mut path, BLOCK_SIZE * 40);
    assert!(peak(&out[out.len() - BLOCK_SIZE..]) < 1e-4);
}

#[test]
fn scope_forwards_only_while_enabled() {
    let (mut engine, mut path) = engine();
    open_tone(&mut engine, 0.5);
    render(&mut path, 1024);
    assert_eq!(engine.scope_reader().slots(), 0);

    engine.scope().send(ScopeMessage::Enable(true)).unwrap();
    render(&mut path, 1024);
    assert_eq!(engine.scope_reader().slots(), 1024);

    let mut waveform = Waveform::new(256);
    assert_eq!(waveform.drain_from(engine.scope_reader()), 1024);
    assert_eq!(waveform.samples().len(), 256);
    assert!(peak(waveform.samples()) > 0.1);
    assert_eq!(engine.scope_reader().slots(), 0);
}

#[test]
fn waveform_keeps_newest_samples_in_order() {
    let (mut producer, mut consumer) = rtrb::RingBuffer::<f32>::new(16);
    let mut waveform = Waveform::new(4);

    for i in 0..6 {
        producer.push(i as f32).unwrap();
    }
    assert_eq!(waveform.drain_from(&mut consumer), 6);
    assert_eq!(waveform.samples(), &[2.0, 3.0, 4.0, 5.0]);

    producer.push(6.0).unwrap();
    waveform.drain_from(&mut consumer);
    assert_eq!(waveform.samples(), &[3.0, 4.0, 5.0, 6.0]);

    waveform.clear();
    assert_eq!(waveform.samples(), &[0.0; 4]);
}

#[test]
fn retune_keeps_the_tone_continuous() {
    let (mut engine, mut path) = engine();
    engine.tone().send(SineMessage::ResetPhase).unwrap();
    open_tone(&mut engine, 0.5);
    let mut out = render(&mut path, 4800);

    engine.tone().send(SineMessage::SetFrequency(880.0)).unwrap();
    out.extend(render(&mut path, 4800));

    // Max step of a 0.5 amplitude 880 Hz sine is about 0.058
    let max_step = out.windows(2).fold(0.0f32, |m, w| m.max((w[1] - w[0]).abs()));
    assert!(max_step < 0.07, "discontinuity of {max_step}");
}

#[test]
fn interleaved_render_duplicates_mono() {
    let (mut engine, mut path) = engine();
    open_tone(&mut engine, 1.0);

    let mut data = vec![0i16; 256 * 2];
    path.render(&mut data, 2, |s| (s * i16::MAX as f32) as i16);

    assert!(data.chunks(2).all(|frame| frame[0] == frame[1]));
    assert!(data.iter().any(|&s| s != 0));
    assert_eq!(engine.clock().frames(), 256);
}
