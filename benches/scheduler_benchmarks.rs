use std::sync::atomic::Ordering;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taktgeber::nodes::{GainMessage, PulseMessage};
use taktgeber::{AudioEngine, ClockSource, Config, EventSink, LookaheadScheduler, ManualClock, Parameters, BLOCK_SIZE};

struct Discard;

impl EventSink for Discard {
    fn schedule_pulse(&mut self, at: f64) -> taktgeber::Result<()> {
        black_box(at);
        Ok(())
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("LookaheadScheduler::on_wake()", |b| {
        let clock = ManualClock::new();
        let params = Parameters::new(240.0, 440.0, 0.5).unwrap();
        let mut scheduler = LookaheadScheduler::new(&Config::default());
        scheduler.start(&clock, 0.05);

        b.iter(move || {
            clock.advance(0.025);
            scheduler.on_wake(&clock, &mut Discard, &params)
        })
    });

    c.bench_function("AudioPath::render() block", |b| {
        let (mut engine, mut path) = AudioEngine::new(48_000, &Config::default());
        engine.clock().resume().unwrap();
        engine.tone_gate().store(true, Ordering::Release);
        engine.tone_gain().send(GainMessage::SetGain(0.5)).unwrap();
        engine.pulse().send(PulseMessage::Trigger { at: 0.0, gain: 0.5 }).unwrap();
        let mut output = [0.0f32; BLOCK_SIZE];

        b.iter(move || path.render_mono(black_box(&mut output)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
