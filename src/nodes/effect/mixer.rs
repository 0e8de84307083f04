//! Mixer effect - sums multiple inputs together

use dasp_graph::{Buffer, Input};
use crate::node::{AudioNode, ProcessContext};

/// A mono mixer that sums every connected input with equal weight.
///
/// Joins the pulse chain and the tone chain ahead of the output.
pub struct Mixer;

impl Mixer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for Mixer {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        let Some(out) = outputs.first_mut() else {
            return;
        };

        out.iter_mut().for_each(|s| *s = 0.0);

        for input in inputs {
            // Multi-channel inputs contribute their first channel
            let Some(in_buf) = input.buffers().first() else {
                continue;
            };
            for (out_sample, in_sample) in out.iter_mut().zip(in_buf.iter()) {
                *out_sample += *in_sample;
            }
        }
    }

    fn num_inputs(&self) -> usize {
        // Accept any number of inputs
        usize::MAX
    }

    fn num_outputs(&self) -> usize { 1 }
}
