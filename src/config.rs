//! Tuning knobs for the scheduler, the audio path and the render loop.

use std::time::Duration;

/// What a wake does when it finds beats that should already have sounded
/// (the wake timer was stalled for longer than the lookahead window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchUp {
    /// Commit every overdue beat immediately, accepting an audible burst.
    FireAll,
    /// Commit at most this many overdue beats, drop the rest and continue
    /// on the original beat grid.
    Cap(usize),
}

impl Default for CatchUp {
    fn default() -> Self {
        CatchUp::Cap(4)
    }
}

/// Engine configuration.
///
/// ```
/// # use std::time::Duration;
/// # use taktgeber::{CatchUp, Config};
/// let config = Config::default()
///     .with_rate(90.0)
///     .with_lookahead(Duration::from_millis(150))
///     .with_catch_up(CatchUp::FireAll);
/// assert_eq!(config.wake_interval, Duration::from_millis(25));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Delay between `start()` and the first beat
    pub lead_in: Duration,
    /// How far ahead of the clock each wake commits beats
    pub lookahead: Duration,
    /// Period of the coarse wake timer
    pub wake_interval: Duration,
    pub catch_up: CatchUp,

    /// Length of one metronome burst
    pub pulse_duration: Duration,
    /// Pitch of the metronome burst in Hz
    pub pulse_frequency: f32,

    /// Time for the pulse indicator to fade from 1 to 0
    pub beat_decay: Duration,
    /// Samples per waveform frame in tone mode
    pub waveform_len: usize,

    /// Sample rate for outputs that do not dictate one (offline rendering)
    pub sample_rate: u32,

    /// Initial beats per minute
    pub rate: f32,
    /// Initial tone frequency in Hz
    pub frequency: f32,
    /// Initial volume in `[0, 1]`
    pub volume: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lead_in: Duration::from_millis(50),
            lookahead: Duration::from_millis(100),
            wake_interval: Duration::from_millis(25),
            catch_up: CatchUp::default(),
            pulse_duration: Duration::from_millis(50),
            pulse_frequency: 1000.0,
            beat_decay: Duration::from_millis(200),
            waveform_len: 1024,
            sample_rate: 48_000,
            rate: 120.0,
            frequency: 440.0,
            volume: 0.5,
        }
    }
}

impl Config {
    pub fn with_lead_in(mut self, lead_in: Duration) -> Self {
        self.lead_in = lead_in;
        self
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_wake_interval(mut self, interval: Duration) -> Self {
        self.wake_interval = interval;
        self
    }

    pub fn with_catch_up(mut self, catch_up: CatchUp) -> Self {
        self.catch_up = catch_up;
        self
    }

    pub fn with_pulse(mut self, frequency: f32, duration: Duration) -> Self {
        self.pulse_frequency = frequency;
        self.pulse_duration = duration;
        self
    }

    pub fn with_beat_decay(mut self, decay: Duration) -> Self {
        self.beat_decay = decay;
        self
    }

    pub fn with_waveform_len(mut self, len: usize) -> Self {
        self.waveform_len = len.max(1);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_rate(mut self, bpm: f32) -> Self {
        self.rate = bpm;
        self
    }

    pub fn with_frequency(mut self, hz: f32) -> Self {
        self.frequency = hz;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }
}
