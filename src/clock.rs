//! Audio clocks.
//!
//! The scheduler never trusts its own timer for timing: every committed
//! event time is arithmetic against a [`ClockSource`], a monotonic clock
//! that belongs to the audio output path.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// A precise monotonic time reference.
///
/// `current_time` never decreases between calls. Implementations are shared
/// between the controller, the wake timer and the audio thread, so every
/// method takes `&self`.
pub trait ClockSource: Send + Sync {
    /// Seconds on the audio clock.
    fn current_time(&self) -> f64;

    /// Let the clock run. Idempotent; fails once the clock is closed.
    fn resume(&self) -> Result<()>;

    /// Release the clock. Idempotent; the clock stops advancing for good.
    fn close(&self) -> Result<()>;
}

const SUSPENDED: u8 = 0;
const RUNNING: u8 = 1;
const CLOSED: u8 = 2;

struct FrameClockInner {
    frames: AtomicU64,
    sample_rate: u32,
    state: AtomicU8,
}

/// Clock driven by the number of frames the audio path has delivered to
/// the output.
///
/// Starts suspended: until [`resume`](ClockSource::resume) is called the
/// path renders silence and the clock stays put.
#[derive(Clone)]
pub struct FrameClock {
    inner: Arc<FrameClockInner>,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(FrameClockInner {
                frames: AtomicU64::new(0),
                sample_rate: sample_rate.max(1),
                state: AtomicU8::new(SUSPENDED),
            }),
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    /// Frames delivered so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.inner.frames.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == RUNNING
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CLOSED
    }

    /// Called by the audio path after delivering `frames` frames.
    #[inline]
    pub(crate) fn advance(&self, frames: u64) {
        self.inner.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

impl ClockSource for FrameClock {
    fn current_time(&self) -> f64 {
        self.frames() as f64 / self.inner.sample_rate as f64
    }

    fn resume(&self) -> Result<()> {
        match self.inner.state.compare_exchange(SUSPENDED, RUNNING, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) | Err(RUNNING) => Ok(()),
            Err(_) => Err(Error::ClockUnavailable("clock is closed".into())),
        }
    }

    fn close(&self) -> Result<()> {
        self.inner.state.store(CLOSED, Ordering::Release);
        Ok(())
    }
}

/// A clock that only moves when told to.
///
/// Used to drive the scheduler deterministically, in tests and in offline
/// renders that have no real-time output behind them.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// `f64` bits; non-negative floats order the same as their bits
    seconds: AtomicU64,
    closed: AtomicBool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock to `seconds`. Earlier times are ignored.
    pub fn set(&self, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            return;
        }
        self.seconds.fetch_max(seconds.to_bits(), Ordering::AcqRel);
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.set(self.current_time() + seconds.max(0.0));
    }
}

impl ClockSource for ManualClock {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.seconds.load(Ordering::Acquire))
    }

    fn resume(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ClockUnavailable("clock is closed".into()));
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
