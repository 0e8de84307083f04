//! Built-in audio nodes.
//!
//! ## Sources ([`source`])
//!
//! - [`PulseSource`] - Fixed-length bursts started on exact clock frames
//! - [`Sine`] - The sustained tone
//!
//! ## Effects ([`effect`])
//!
//! - [`Gain`] - Tone volume with smoothing
//! - [`Scope`] - Waveform tap for the render thread
//! - [`Mixer`] - Sums the pulse and tone chains
//!
//! ## Sinks ([`sink`])
//!
//! - [`RtrbSink`] - Graph terminal feeding the audio path
//!
//! # Message Types
//!
//! - [`PulseMessage`] - Schedule bursts on a [`PulseSource`]
//! - [`SineMessage`] - Control [`Sine`] frequency, amplitude and phase
//! - [`GainMessage`] - Control [`Gain`] level
//! - [`ScopeMessage`] - Enable or disable a [`Scope`]

pub mod source;
pub mod effect;
pub mod sink;

pub use source::{PulseMessage, PulseSource, Sine, SineMessage};
pub use effect::{Gain, GainMessage, Mixer, Scope, ScopeMessage};
pub use sink::RtrbSink;
