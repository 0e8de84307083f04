//! Lookahead scheduling.
//!
//! A coarse wake timer decides *when* to compute; the audio clock decides
//! *what* gets committed. Each wake commits every event falling inside the
//! lookahead window, with times derived purely from clock arithmetic, so a
//! late or jittery timer can never shift an audible beat.
//!
//! ```
//! use taktgeber::{Config, EventSink, LookaheadScheduler, ManualClock, Parameters};
//!
//! struct Record(Vec<f64>);
//!
//! impl EventSink for Record {
//!     fn schedule_pulse(&mut self, at: f64) -> taktgeber::Result<()> {
//!         self.0.push(at);
//!         Ok(())
//!     }
//! }
//!
//! let clock = ManualClock::new();
//! let params = Parameters::new(120.0, 440.0, 0.5).unwrap();
//! let mut sink = Record(Vec::new());
//!
//! let mut scheduler = LookaheadScheduler::new(&Config::default());
//! scheduler.start(&clock, 0.05);
//! scheduler.on_wake(&clock, &mut sink, &params);
//! assert_eq!(sink.0, vec![0.05]);
//! ```

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use crate::clock::ClockSource;
use crate::config::{CatchUp, Config};
use crate::error::{Error, Result};
use crate::event::EventSink;
use crate::params::Parameters;

/// Hard bound on commits per wake, against absurd rates.
const MAX_EVENTS_PER_WAKE: usize = 256;

/// Scheduling state for one `start()`/`stop()` cycle.
#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    next_event_time: f64,
    /// Grid slot the next event is one period after: the last committed
    /// event, or the last dropped one after a stall. `None` before the first.
    anchor: Option<f64>,
    lookahead: f64,
    wake_interval: Duration,
    catch_up: CatchUp,
    last_committed: Option<f64>,
}

impl LookaheadScheduler {
    pub fn new(config: &Config) -> Self {
        Self {
            next_event_time: 0.0,
            anchor: None,
            lookahead: config.lookahead.as_secs_f64(),
            wake_interval: config.wake_interval,
            catch_up: config.catch_up,
            last_committed: None,
        }
    }

    /// Reset the schedule so the first event lands `initial_delay` seconds
    /// after the clock's current time.
    pub fn start(&mut self, clock: &dyn ClockSource, initial_delay: f64) {
        self.next_event_time = clock.current_time() + initial_delay.max(0.0);
        self.anchor = None;
        self.last_committed = None;
        debug!(next_event_time = self.next_event_time, "scheduler started");
    }

    /// Commit every event due within the lookahead window.
    ///
    /// Each event is placed one period after the previous one, with the
    /// period read from `params` when that event is committed. A rate change
    /// therefore sets the gap before the next uncommitted event and never
    /// moves events already committed. Returns the number of events committed.
    pub fn on_wake(&mut self, clock: &dyn ClockSource, sink: &mut dyn EventSink, params: &Parameters) -> usize {
        let now = clock.current_time();
        let horizon = now + self.lookahead;
        let mut committed = 0;
        let mut overdue = 0;

        while committed < MAX_EVENTS_PER_WAKE {
            let period = params.period();
            if let Some(prev) = self.anchor {
                self.next_event_time = prev + period;
            }

            let t = self.next_event_time;
            if t >= horizon {
                break;
            }

            if t < now {
                overdue += 1;
                if let CatchUp::Cap(max) = self.catch_up {
                    if overdue > max {
                        // Jump along the beat grid to the first slot not in the past
                        let skipped = ((now - t) / period).ceil().max(1.0);
                        self.anchor = Some(t + (skipped - 1.0) * period);
                        warn!(dropped = skipped as u64, stall = now - t, "scheduler stalled, dropping overdue beats");
                        continue;
                    }
                }
            }

            if self.last_committed.is_some_and(|last| t <= last) {
                // Period below float resolution at this clock time
                warn!(time = t, "event time did not advance, skipping rest of wake");
                break;
            }

            if let Err(e) = sink.schedule_pulse(t) {
                warn!(time = t, error = %e, "failed to commit event");
            }
            trace!(time = t, period, "event committed");

            self.anchor = Some(t);
            self.last_committed = Some(t);
            self.next_event_time = t + period;
            committed += 1;
        }

        committed
    }

    /// Time of the next event as of the last wake or start.
    ///
    /// After a rate change this is stale until the next wake; see
    /// [`upcoming`](Self::upcoming).
    #[inline]
    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Time the next event would be committed at with the current rate.
    pub fn upcoming(&self, params: &Parameters) -> f64 {
        match self.anchor {
            Some(prev) => prev + params.period(),
            None => self.next_event_time,
        }
    }

    /// Time of the most recently committed event in this cycle.
    #[inline]
    pub fn last_committed(&self) -> Option<f64> {
        self.last_committed
    }

    #[inline]
    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    #[inline]
    pub fn wake_interval(&self) -> Duration {
        self.wake_interval
    }
}

/// The coarse repeating wake: a thread calling back every `interval` until
/// cancelled.
///
/// The callback's fire time carries no timing information; it only says
/// "compute more now".
pub struct WakeTimer {
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WakeTimer {
    pub fn spawn<F>(interval: Duration, mut on_wake: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel, cancelled) = crossbeam_channel::bounded::<()>(0);

        let thread = thread::Builder::new()
            .name("taktgeber-wake".into())
            .spawn(move || loop {
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => on_wake(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| Error::TimerUnavailable(e.to_string()))?;

        Ok(Self {
            cancel: Some(cancel),
            thread: Some(thread),
        })
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop the timer and wait for an in-flight wake to finish. Once this
    /// returns, the callback will not run again. Idempotent.
    pub fn cancel(&mut self) -> Result<()> {
        drop(self.cancel.take());
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::ResourceRelease("wake timer thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for WakeTimer {
    fn drop(&mut self) {
        if let Err(e) = self.cancel() {
            warn!(error = %e, "wake timer did not shut down cleanly");
        }
    }
}
