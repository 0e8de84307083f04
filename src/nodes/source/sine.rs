//! Sine wave oscillator

use dasp_graph::{Buffer, Input};
use crate::node::{AudioNode, ProcessContext};

/// Messages to control a Sine oscillator
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SineMessage {
    SetFrequency(f32),
    SetAmplitude(f32),
    /// Restart the waveform at phase zero
    ResetPhase,
}

/// A sine wave oscillator (mono source)
///
/// This is the sustained tone. It lives in the graph for the whole life of
/// the engine; frequency changes are applied to the running phase, so the
/// waveform stays continuous across retunes.
pub struct Sine {
    frequency: f32,
    phase: f32,
    amplitude: f32,
}

impl Sine {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            amplitude: 1.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

impl AudioNode for Sine {
    type Message = SineMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = SineMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                SineMessage::SetFrequency(f) => self.frequency = f.max(0.0),
                SineMessage::SetAmplitude(a) => self.amplitude = a.clamp(0.0, 1.0),
                SineMessage::ResetPhase => self.phase = 0.0,
            }
        }

        let Some(out) = outputs.first_mut() else {
            return;
        };

        let phase_inc = self.frequency / ctx.sample_rate as f32;
        let amplitude = self.amplitude;

        for sample in out.iter_mut() {
            *sample = (self.phase * core::f32::consts::TAU).sin() * amplitude;

            self.phase += phase_inc;
            // Branchless phase wrap (phase is always positive)
            self.phase -= (self.phase >= 1.0) as u32 as f32;
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
