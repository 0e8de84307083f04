//! Scheduled tone bursts (the metronome click)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dasp_graph::{Buffer, Input};

use crate::beat::{onset_delay, BeatSignal};
use crate::node::{AudioNode, ProcessContext};

/// Upper bound on bursts waiting to start, one full trigger queue. Never
/// grown on the audio thread; triggers past it are counted and dropped.
const MAX_PENDING: usize = 64;

/// Fade in/out length, against clicks at the burst edges
const FADE_SECS: f32 = 0.002;

/// Messages to control a PulseSource
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PulseMessage {
    /// Start a burst at audio clock time `at` (seconds), with a fixed gain
    Trigger { at: f64, gain: f32 },
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    frame: u64,
    time: f64,
    gain: f32,
}

#[derive(Clone, Copy, Debug)]
struct Burst {
    pos: u32,
    len: u32,
    gain: f32,
    phase: f32,
}

/// Renders fixed-length sine bursts starting on exact frames.
///
/// Triggers carry the gain captured when they were committed, so volume
/// changes never touch a burst that is already scheduled. When a burst
/// begins rendering its onset is written to the [`BeatSignal`].
pub struct PulseSource {
    frequency: f32,
    duration: f32,
    pending: VecDeque<Pending>,
    active: Option<Burst>,
    beat: Arc<BeatSignal>,
    dropped: Option<Arc<AtomicU64>>,
}

impl PulseSource {
    pub fn new(frequency: f32, duration_secs: f32, beat: Arc<BeatSignal>) -> Self {
        Self {
            frequency,
            duration: duration_secs.max(0.0),
            pending: VecDeque::with_capacity(MAX_PENDING),
            active: None,
            beat,
            dropped: None,
        }
    }

    /// Count triggers dropped because `MAX_PENDING` bursts were already waiting.
    pub fn with_drop_counter(mut self, dropped: Arc<AtomicU64>) -> Self {
        self.dropped = Some(dropped);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    fn enqueue(&mut self, ctx: &ProcessContext, at: f64, gain: f32) {
        if self.pending.len() == MAX_PENDING {
            if let Some(dropped) = &self.dropped {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }
        let frame = ctx.frame_at(at);
        // Triggers arrive in time order; keep the queue sorted anyway
        let idx = self.pending.iter().position(|p| p.frame > frame).unwrap_or(self.pending.len());
        self.pending.insert(idx, Pending { frame, time: at, gain: gain.clamp(0.0, 1.0) });
    }
}

impl AudioNode for PulseSource {
    type Message = PulseMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = PulseMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                PulseMessage::Trigger { at, gain } => self.enqueue(ctx, at, gain),
            }
        }

        let Some(out) = outputs.first_mut() else {
            return;
        };

        let sample_rate = ctx.sample_rate as f32;
        let burst_len = (self.duration * sample_rate).round() as u32;
        let fade = ((FADE_SECS * sample_rate) as u32).clamp(1, (burst_len / 2).max(1)) as f32;
        let phase_inc = self.frequency / sample_rate;
        let block_time = ctx.time();
        let mut block_start: Option<Instant> = None;

        for (i, sample) in out.iter_mut().enumerate() {
            let frame = ctx.frame + i as u64;

            while let Some(next) = self.pending.front().copied() {
                if next.frame > frame {
                    break;
                }
                self.pending.pop_front();
                self.active = Some(Burst { pos: 0, len: burst_len, gain: next.gain, phase: 0.0 });

                let now = *block_start.get_or_insert_with(Instant::now);
                let offset = i as f64 / ctx.sample_rate as f64;
                // Late triggers are clamped to the current frame
                let onset = next.time.max(block_time + offset);
                self.beat.mark(now + onset_delay(onset, block_time));
            }

            *sample = match self.active.as_mut() {
                Some(burst) if burst.pos < burst.len => {
                    let ramp_in = burst.pos as f32 / fade;
                    let ramp_out = (burst.len - burst.pos) as f32 / fade;
                    let env = ramp_in.min(ramp_out).min(1.0);
                    let s = (burst.phase * core::f32::consts::TAU).sin() * burst.gain * env;

                    burst.pos += 1;
                    burst.phase += phase_inc;
                    burst.phase -= (burst.phase >= 1.0) as u32 as f32;
                    s
                }
                Some(_) => {
                    self.active = None;
                    0.0
                }
                None => 0.0,
            };
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
