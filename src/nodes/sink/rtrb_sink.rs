//! Ring buffer sink - the graph terminal feeding the audio path

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::node::{AudioNode, ProcessContext};

/// A sink that pushes mono audio into an rtrb ring buffer.
///
/// The [`AudioPath`](crate::AudioPath) owns the consumer end and
/// pulls whole blocks from it when the output asks for samples.
pub struct RtrbSink {
    producer: Producer<f32>,
}

impl RtrbSink {
    pub fn new(producer: Producer<f32>) -> Self {
        Self { producer }
    }

    /// Returns how many sample slots are available
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }
}

impl AudioNode for RtrbSink {
    type Message = (); // No control messages

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        let Some(buffer) = inputs.first().and_then(|i| i.buffers().first()) else {
            return;
        };

        // Skip rather than partially write
        if self.producer.slots() < buffer.len() {
            return;
        }

        for &sample in buffer.iter() {
            let _ = self.producer.push(sample);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
