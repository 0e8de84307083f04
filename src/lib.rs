//! Taktgeber - drift-free metronome and live tone
//!
//! Design principles:
//! - Beat times come from the audio clock, never from the wake timer
//! - A coarse timer only decides when to commit the next lookahead window
//! - Nodes receive parameters via message ring buffers, not shared state
//! - Nothing on the audio thread locks or allocates
//! - The render thread reads beats and waveforms without blocking
//!
//! ```
//! use taktgeber::{Frame, Mode, OfflineOutput, PlaybackController};
//!
//! let output = OfflineOutput::new();
//! let mut controller = PlaybackController::new(output.clone());
//!
//! controller.start(Mode::Tone).unwrap();
//! output.render_secs(0.1);
//!
//! match controller.frame(std::time::Instant::now()) {
//!     Some(Frame::Waveform { samples }) => assert_eq!(samples.len(), 1024),
//!     other => panic!("expected a waveform, got {other:?}"),
//! }
//! ```

extern crate alloc;

mod beat;
mod clock;
mod config;
mod controller;
mod engine;
mod error;
mod event;
mod graph;
mod node;
mod output;
mod params;
mod render;
mod scheduler;
pub mod nodes;

#[cfg(feature = "cpal_sink")]
mod device;

pub use beat::{onset_delay, BeatSignal};
pub use clock::{ClockSource, FrameClock, ManualClock};
pub use config::{CatchUp, Config};
pub use controller::{Mode, PlaybackController, PlaybackState};
pub use engine::{AudioEngine, AudioPath, Handle};
pub use error::{Error, Result};
pub use event::{EventSink, PulseSink};
pub use node::{AudioNode, NodeId, ProcessContext, BLOCK_SIZE};
pub use output::{AudioOutput, OfflineOutput};
pub use params::Parameters;
pub use render::{Frame, RenderLoop, Waveform};
pub use scheduler::{LookaheadScheduler, WakeTimer};

#[cfg(feature = "cpal_sink")]
pub use device::{CpalDevice, CpalOutput};
