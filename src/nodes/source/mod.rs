//! Audio source nodes (generators with no audio inputs)

mod pulse;
mod sine;

pub use pulse::{PulseMessage, PulseSource};
pub use sine::{Sine, SineMessage};
