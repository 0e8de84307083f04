//! Oscilloscope tap

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::node::{AudioNode, ProcessContext};

/// Messages to control a Scope
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScopeMessage {
    /// Start or stop forwarding samples
    Enable(bool),
}

/// Passes audio through unchanged and, while enabled, copies it into a ring
/// buffer read by the render thread.
///
/// Samples that do not fit are dropped; the reader only ever wants the most
/// recent window.
pub struct Scope {
    producer: Producer<f32>,
    enabled: bool,
}

impl Scope {
    pub fn new(producer: Producer<f32>) -> Self {
        Self {
            producer,
            enabled: false,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl AudioNode for Scope {
    type Message = ScopeMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        messages: impl Iterator<Item = ScopeMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                ScopeMessage::Enable(on) => self.enabled = on,
            }
        }

        let Some(out) = outputs.first_mut() else {
            return;
        };

        match inputs.first().and_then(|i| i.buffers().first()) {
            Some(input) => out.copy_from_slice(input),
            None => out.iter_mut().for_each(|s| *s = 0.0),
        }

        if !self.enabled {
            return;
        }

        for &s in out.iter() {
            if self.producer.push(s).is_err() {
                break;
            }
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
