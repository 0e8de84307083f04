//! Committing scheduled events to the audio path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::engine::Handle;
use crate::error::{Error, Result};
use crate::nodes::PulseMessage;
use crate::params::Parameters;

/// Receives event times from the scheduler.
///
/// Calls arrive in strictly increasing time order. Implementations must not
/// block: they run inside the scheduler lock on the wake thread.
pub trait EventSink: Send {
    /// Commit a pulse starting at audio clock time `at`.
    fn schedule_pulse(&mut self, at: f64) -> Result<()>;
}

/// Sends pulses to the engine's [`PulseSource`](crate::nodes::PulseSource).
///
/// The volume is read when the pulse is committed and travels with the
/// trigger, so later volume changes never reach pulses already in flight.
///
/// With a drop counter attached, triggers the audio path had to discard are
/// logged on the next commit.
pub struct PulseSink {
    handle: Handle<PulseMessage>,
    params: Arc<Parameters>,
    dropped: Option<Arc<AtomicU64>>,
    reported: u64,
}

impl PulseSink {
    pub fn new(handle: Handle<PulseMessage>, params: Arc<Parameters>) -> Self {
        Self { handle, params, dropped: None, reported: 0 }
    }

    pub fn with_drop_counter(mut self, dropped: Arc<AtomicU64>) -> Self {
        self.reported = dropped.load(Ordering::Relaxed);
        self.dropped = Some(dropped);
        self
    }

    /// Total triggers dropped by the audio path.
    pub fn dropped(&self) -> u64 {
        self.dropped.as_ref().map_or(0, |d| d.load(Ordering::Relaxed))
    }

    fn report_drops(&mut self) {
        let total = self.dropped();
        if total > self.reported {
            warn!(dropped = total - self.reported, total, "audio path dropped pulse triggers");
            self.reported = total;
        }
    }
}

impl EventSink for PulseSink {
    fn schedule_pulse(&mut self, at: f64) -> Result<()> {
        self.report_drops();
        let gain = self.params.volume();
        self.handle
            .send(PulseMessage::Trigger { at, gain })
            .map_err(|_| Error::QueueFull)
    }
}
