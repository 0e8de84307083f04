//! Core node trait and context types.

use dasp_graph::{Buffer, Input};

/// Number of frames in every block handed to [`AudioNode::process`].
pub const BLOCK_SIZE: usize = 64;

/// Information available during audio processing.
///
/// Passed to every [`AudioNode::process`] call. Besides the sample rate it
/// carries the absolute position of the block on the audio clock, which is
/// what lets nodes start events on an exact frame.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of frames per block (always [`BLOCK_SIZE`])
    pub buffer_size: usize,
    /// Absolute frame index of the first sample in this block
    pub frame: u64,
}

impl ProcessContext {
    /// Audio clock time of the first sample in this block, in seconds.
    #[inline]
    pub fn time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Converts an audio clock time to an absolute frame index.
    #[inline]
    pub fn frame_at(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

/// Unique identifier for a node within a graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

/// The core trait for audio processing nodes.
///
/// Nodes can be:
/// - **Sources**: Generate audio (0 inputs, 1 output) - tone, pulse bursts
/// - **Effects**: Process audio (1+ inputs, 1 output) - gain, mixer, scope
/// - **Sinks**: Consume audio (1 input, 0 outputs) - the output path
///
/// # Message-Based Parameters
///
/// Instead of shared mutable state, nodes receive parameter updates via
/// messages sent through a [`Handle`](crate::Handle). Pending
/// messages are drained at the start of each block, so an update always
/// lands on a block boundary and never races the render.
pub trait AudioNode: Send + 'static {
    /// Message type for parameter updates (use `()` if none needed).
    type Message: Send + 'static;

    /// Process one block of audio.
    ///
    /// 1. Drain and handle all pending messages
    /// 2. Read from inputs, write to outputs
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    );

    /// Number of audio input channels (0 for sources).
    fn num_inputs(&self) -> usize { 0 }

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize { 1 }
}
