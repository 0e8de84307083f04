//! Gain/volume control effect

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dasp_graph::{Buffer, Input};
use crate::node::{AudioNode, ProcessContext};

/// Messages to control gain
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GainMessage {
    /// Set the gain multiplier (1.0 = unity, 0.0 = silence)
    SetGain(f32),
}

/// A smoothed gain stage.
///
/// Carries the tone volume: opening it starts the tone, closing it stops the
/// tone, and live volume changes glide over a few milliseconds instead of
/// stepping.
///
/// An optional gate overrides the level: while the gate is closed the output
/// fades to silence whatever gain was last set. The gate is a shared flag, so
/// closing it can never be lost to a full message queue.
pub struct Gain {
    gain: f32,
    gate: Option<Arc<AtomicBool>>,
    /// Smoothing to prevent clicks on rapid gain changes
    smoothed_gain: f32,
    /// Smoothing coefficient (0.0 = instant, 1.0 = no change)
    smooth_coeff: f32,
}

impl Gain {
    /// Create a new gain node with the specified gain value
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            gate: None,
            smoothed_gain: gain,
            smooth_coeff: 0.995, // ~4ms at 48kHz
        }
    }

    /// Set the smoothing time in milliseconds
    pub fn with_smoothing_ms(mut self, ms: f32, sample_rate: u32) -> Self {
        // Time constant: after `ms` milliseconds, we've reached ~63% of target
        let samples = (ms / 1000.0) * sample_rate as f32;
        self.smooth_coeff = if samples > 0.0 { (-1.0 / samples).exp() } else { 0.0 };
        self
    }

    /// Disable smoothing for instant gain changes
    pub fn without_smoothing(mut self) -> Self {
        self.smooth_coeff = 0.0;
        self
    }

    /// Only pass audio while `gate` is `true`
    pub fn with_gate(mut self, gate: Arc<AtomicBool>) -> Self {
        self.gate = Some(gate);
        self
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    fn is_open(&self) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate.load(Ordering::Acquire))
    }
}

impl AudioNode for Gain {
    type Message = GainMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        messages: impl Iterator<Item = GainMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                GainMessage::SetGain(g) => self.gain = g.max(0.0),
            }
        }

        let Some(out) = outputs.first_mut() else {
            return;
        };

        let Some(input) = inputs.first().and_then(|i| i.buffers().first()) else {
            out.iter_mut().for_each(|s| *s = 0.0);
            return;
        };

        let smooth_coeff = self.smooth_coeff;
        let target_gain = if self.is_open() { self.gain } else { 0.0 };
        let mut gain = self.smoothed_gain;

        for (out_sample, &in_sample) in out.iter_mut().zip(input.iter()) {
            gain = target_gain + smooth_coeff * (gain - target_gain);
            *out_sample = in_sample * gain;
        }

        // Snap once inaudible so a closed gain really reaches silence
        if (gain - target_gain).abs() < 1e-5 {
            gain = target_gain;
        }
        self.smoothed_gain = gain;
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
