//! Beat signal: hands audio-domain onsets to the render thread.
//!
//! The audio path writes the wall-clock time of each pulse onset into a
//! single atomic slot; the render loop reads it once per frame. Nothing
//! blocks and no per-beat timer objects exist.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Slot value meaning "no beat recorded".
const NO_BEAT: u64 = 0;

/// Wait-free single-slot timestamp of the most recent beat onset.
#[derive(Debug)]
pub struct BeatSignal {
    epoch: Instant,
    /// Nanoseconds since `epoch`, plus one so that zero can mean "none"
    last_beat: AtomicU64,
    armed: AtomicBool,
}

impl BeatSignal {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_beat: AtomicU64::new(NO_BEAT),
            armed: AtomicBool::new(false),
        }
    }

    /// Accept onsets from now on.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stop accepting onsets and forget the last one.
    ///
    /// Pulses already committed to the audio path may still render after
    /// this; their onsets are dropped.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        self.last_beat.store(NO_BEAT, Ordering::Release);
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Record an onset at `at`. Returns `false` if the signal is disarmed.
    pub fn mark(&self, at: Instant) -> bool {
        if !self.is_armed() {
            return false;
        }
        let nanos = at.saturating_duration_since(self.epoch).as_nanos() as u64;
        self.last_beat.store(nanos.saturating_add(1), Ordering::Release);
        true
    }

    /// Wall-clock time of the latest onset, if any.
    pub fn last_beat(&self) -> Option<Instant> {
        match self.last_beat.load(Ordering::Acquire) {
            NO_BEAT => None,
            nanos => Some(self.epoch + Duration::from_nanos(nanos - 1)),
        }
    }

    /// Pulse indicator intensity at `now`: 1 at the onset, falling linearly
    /// to 0 after `window`. Onsets still in the future count as 1.
    pub fn decay(&self, now: Instant, window: Duration) -> f32 {
        let Some(beat) = self.last_beat() else {
            return 0.0;
        };
        if window.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(beat);
        (1.0 - elapsed.as_secs_f32() / window.as_secs_f32()).clamp(0.0, 1.0)
    }
}

impl Default for BeatSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock delay until an audio event at clock time `event_time`, seen
/// from clock time `now`. Events in the past map to zero.
pub fn onset_delay(event_time: f64, now: f64) -> Duration {
    let secs = event_time - now;
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
