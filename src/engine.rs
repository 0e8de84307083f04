//! The audio engine: a fixed graph split into a render half and a control half.
//!
//! ```text
//! PulseSource ─────────────────────┐
//!                                  ├─> Mixer ─> RtrbSink ─> AudioPath ─> output
//! Sine ─> Gain (volume) ─> Scope ──┘               │
//!                           └─> scope ring ─> render thread
//! ```
//!
//! [`AudioEngine::new`] returns both halves. The [`AudioPath`] moves to the
//! output's audio thread; the [`AudioEngine`] stays with the controller and
//! talks to the nodes only through lock-free message queues.

use core::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, RingBuffer};

use crate::beat::BeatSignal;
use crate::clock::FrameClock;
use crate::config::Config;
use crate::graph::{AudioGraph, NodeHandle};
use crate::node::{NodeId, BLOCK_SIZE};
use crate::nodes::{
    Gain, GainMessage, Mixer, PulseMessage, PulseSource, RtrbSink, Scope, ScopeMessage, Sine,
    SineMessage,
};

/// A handle for sending messages to a node in the audio graph.
///
/// Messages are buffered in a lock-free ring buffer and processed at the
/// start of the next audio block. If the buffer is full, [`Handle::send`]
/// returns `Err(msg)` with the message that couldn't be sent.
pub struct Handle<M: Send + 'static> {
    pub(crate) node_id: NodeId,
    pub(crate) sender: rtrb::Producer<M>,
    pub(crate) _marker: PhantomData<M>,
}

impl<M: Send + 'static> Handle<M> {
    /// Send a message to the node. Lock-free.
    pub fn send(&mut self, msg: M) -> Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
}

impl<M: Send + 'static> From<NodeHandle<M>> for Handle<M> {
    fn from(handle: NodeHandle<M>) -> Self {
        Self {
            node_id: handle.id,
            sender: handle.sender,
            _marker: PhantomData,
        }
    }
}

/// The render half: owns the graph and produces output samples.
///
/// Meant to be driven from an audio callback. Nothing here locks or
/// allocates; the clock advances by exactly the frames delivered.
pub struct AudioPath {
    graph: AudioGraph,
    output: Consumer<f32>,
    clock: FrameClock,
}

impl AudioPath {
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    #[inline]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Fill an interleaved buffer of `channels` channels, converting each
    /// mono sample with `convert`.
    ///
    /// While the clock is not running the buffer is filled with silence and
    /// the clock does not move.
    pub fn render<S: Copy>(&mut self, data: &mut [S], channels: usize, convert: impl Fn(f32) -> S) {
        let channels = channels.max(1);

        if !self.clock.is_running() {
            data.fill(convert(0.0));
            return;
        }

        let mut frames = 0u64;
        for frame in data.chunks_mut(channels) {
            let s = convert(self.next_sample());
            frame.fill(s);
            frames += 1;
        }
        self.clock.advance(frames);
    }

    /// Fill a mono `f32` buffer.
    pub fn render_mono(&mut self, data: &mut [f32]) {
        self.render(data, 1, |s| s);
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.output.is_empty() {
            self.graph.process();
        }
        self.output.pop().unwrap_or(0.0)
    }
}

/// The control half: message handles, clock and visual taps.
pub struct AudioEngine {
    pub(crate) clock: FrameClock,
    pub(crate) beat: Arc<BeatSignal>,
    pub(crate) pulse: Handle<PulseMessage>,
    pub(crate) pulse_drops: Arc<AtomicU64>,
    pub(crate) tone: Handle<SineMessage>,
    pub(crate) tone_gain: Handle<GainMessage>,
    pub(crate) tone_gate: Arc<AtomicBool>,
    pub(crate) scope: Handle<ScopeMessage>,
    pub(crate) scope_reader: Consumer<f32>,
}

impl AudioEngine {
    /// Build the graph at `sample_rate` and split it.
    pub fn new(sample_rate: u32, config: &Config) -> (Self, AudioPath) {
        let clock = FrameClock::new(sample_rate);
        let beat = Arc::new(BeatSignal::new());

        let mut graph = AudioGraph::new(sample_rate);

        let (out_producer, out_consumer) = RingBuffer::<f32>::new(BLOCK_SIZE * 4);
        let sink = graph.add(RtrbSink::new(out_producer));
        graph.set_terminal(sink.id());

        let mixer = graph.add(Mixer::new());
        graph.connect(mixer.id(), sink.id());

        let pulse_drops = Arc::new(AtomicU64::new(0));
        let pulse = graph.add(
            PulseSource::new(config.pulse_frequency, config.pulse_duration.as_secs_f32(), beat.clone())
                .with_drop_counter(pulse_drops.clone()),
        );
        graph.connect(pulse.id(), mixer.id());

        // Closed gain and gate until the tone is started
        let tone = graph.add(Sine::new(config.frequency));
        let tone_gate = Arc::new(AtomicBool::new(false));
        let tone_gain = graph.add(
            Gain::new(0.0)
                .with_smoothing_ms(4.0, sample_rate)
                .with_gate(tone_gate.clone()),
        );
        let scope_len = (config.waveform_len.max(BLOCK_SIZE) * 4).next_power_of_two();
        let (scope_producer, scope_reader) = RingBuffer::<f32>::new(scope_len);
        let scope = graph.add(Scope::new(scope_producer));
        graph.connect(tone.id(), tone_gain.id());
        graph.connect(tone_gain.id(), scope.id());
        graph.connect(scope.id(), mixer.id());

        let engine = Self {
            clock: clock.clone(),
            beat,
            pulse: pulse.into(),
            pulse_drops,
            tone: tone.into(),
            tone_gain: tone_gain.into(),
            tone_gate,
            scope: scope.into(),
            scope_reader,
        };

        let path = AudioPath {
            graph,
            output: out_consumer,
            clock,
        };

        (engine, path)
    }

    #[inline]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    #[inline]
    pub fn beat(&self) -> &Arc<BeatSignal> {
        &self.beat
    }

    /// Queue for scheduling metronome bursts.
    pub fn pulse(&mut self) -> &mut Handle<PulseMessage> {
        &mut self.pulse
    }

    /// Triggers the pulse source dropped because too many were waiting.
    pub fn dropped_pulses(&self) -> u64 {
        self.pulse_drops.load(Ordering::Relaxed)
    }

    /// Queue for the tone oscillator.
    pub fn tone(&mut self) -> &mut Handle<SineMessage> {
        &mut self.tone
    }

    /// Queue for the tone volume.
    pub fn tone_gain(&mut self) -> &mut Handle<GainMessage> {
        &mut self.tone_gain
    }

    /// Gate on the tone volume. The tone is silent while this is `false`,
    /// whatever gain was sent.
    pub fn tone_gate(&self) -> &Arc<AtomicBool> {
        &self.tone_gate
    }

    /// Queue for the waveform tap.
    pub fn scope(&mut self) -> &mut Handle<ScopeMessage> {
        &mut self.scope
    }

    /// Reader end of the waveform tap.
    pub fn scope_reader(&mut self) -> &mut Consumer<f32> {
        &mut self.scope_reader
    }
}
