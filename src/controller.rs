//! The playback state machine: the public surface of the crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::beat::BeatSignal;
use crate::clock::{ClockSource, FrameClock};
use crate::config::Config;
use crate::engine::{AudioEngine, Handle};
use crate::error::{Error, Result};
use crate::event::PulseSink;
use crate::nodes::{GainMessage, ScopeMessage, SineMessage};
use crate::output::AudioOutput;
use crate::params::Parameters;
use crate::render::{Frame, Visuals};
use crate::scheduler::{LookaheadScheduler, WakeTimer};

/// What to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Periodic pulses at `rate` BPM
    Metronome,
    /// One sustained tone at `frequency` Hz
    Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Metronome running
    Playing,
    /// Sustained tone running
    ToneActive,
}

/// Scheduling state and the pulse queue, behind the single lock shared
/// with the wake timer. `schedule` only exists while the metronome plays.
struct Lane {
    schedule: Option<LookaheadScheduler>,
    sink: PulseSink,
}

/// Control half of the engine, opened on the first start and kept for the
/// controller's lifetime so restarts are instant.
struct Audio {
    clock: FrameClock,
    beat: Arc<BeatSignal>,
    tone: Handle<SineMessage>,
    tone_gain: Handle<GainMessage>,
    tone_gate: Arc<AtomicBool>,
    scope: Handle<ScopeMessage>,
    lane: Arc<Mutex<Lane>>,
    visuals: Visuals,
}

/// Resources owned by one start/stop cycle.
enum Session {
    Metronome { timer: WakeTimer },
    Tone,
}

/// Starts, stops and retunes playback.
///
/// ```
/// use taktgeber::{Mode, OfflineOutput, PlaybackController, PlaybackState};
///
/// let output = OfflineOutput::new();
/// let mut controller = PlaybackController::new(output.clone());
///
/// controller.set_rate(90.0).unwrap();
/// controller.start(Mode::Metronome).unwrap();
/// assert_eq!(controller.state(), PlaybackState::Playing);
///
/// // Offline output: rendering is what moves the clock
/// let audio = output.render_secs(0.25);
/// assert!(audio.iter().any(|s| s.abs() > 0.01));
///
/// controller.stop();
/// assert_eq!(controller.state(), PlaybackState::Idle);
/// assert!(controller.frame(std::time::Instant::now()).is_none());
/// ```
pub struct PlaybackController {
    config: Config,
    params: Arc<Parameters>,
    output: Box<dyn AudioOutput>,
    audio: Option<Audio>,
    session: Option<Session>,
}

impl PlaybackController {
    /// Controller with the default configuration.
    pub fn new(output: impl AudioOutput + 'static) -> Self {
        let config = Config::default();
        Self {
            params: Arc::new(Parameters::default()),
            config,
            output: Box::new(output),
            audio: None,
            session: None,
        }
    }

    /// Controller with a custom configuration. Fails if the initial rate,
    /// frequency or volume is out of range.
    pub fn with_config(output: impl AudioOutput + 'static, config: Config) -> Result<Self> {
        let params = Parameters::new(config.rate, config.frequency, config.volume)?;
        Ok(Self {
            params: Arc::new(params),
            config,
            output: Box::new(output),
            audio: None,
            session: None,
        })
    }

    pub fn state(&self) -> PlaybackState {
        match self.session {
            None => PlaybackState::Idle,
            Some(Session::Metronome { .. }) => PlaybackState::Playing,
            Some(Session::Tone) => PlaybackState::ToneActive,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn rate(&self) -> f32 {
        self.params.rate()
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.params.frequency()
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.params.volume()
    }

    /// Current audio clock time, once the output has been opened.
    pub fn clock_time(&self) -> Option<f64> {
        self.audio.as_ref().map(|audio| audio.clock.current_time())
    }

    /// Snapshot of the scheduling state while the metronome plays.
    pub fn schedule(&self) -> Option<LookaheadScheduler> {
        let audio = self.audio.as_ref()?;
        let lane = audio.lane.lock();
        lane.schedule.clone()
    }

    /// Clock time the next beat will be committed at, given the current rate.
    pub fn next_beat(&self) -> Option<f64> {
        let audio = self.audio.as_ref()?;
        let lane = audio.lane.lock();
        lane.schedule.as_ref().map(|schedule| schedule.upcoming(&self.params))
    }

    /// Beats the audio path discarded because too many were waiting. Zero
    /// unless the scheduling window holds more beats than the pulse queue.
    pub fn dropped_beats(&self) -> u64 {
        self.audio.as_ref().map_or(0, |audio| audio.lane.lock().sink.dropped())
    }

    /// Start playing `mode`.
    ///
    /// A no-op if `mode` is already playing. If the other mode is playing it
    /// is stopped first. On error the controller stays idle.
    pub fn start(&mut self, mode: Mode) -> Result<()> {
        match (self.state(), mode) {
            (PlaybackState::Playing, Mode::Metronome) | (PlaybackState::ToneActive, Mode::Tone) => {
                debug!(?mode, "already playing");
                return Ok(());
            }
            (PlaybackState::Idle, _) => {}
            _ => self.stop(),
        }

        self.open_audio()?;
        let Some(audio) = self.audio.as_mut() else {
            return Err(Error::ClockUnavailable("audio output is not open".into()));
        };
        audio.clock.resume()?;

        let session = match mode {
            Mode::Metronome => start_metronome(audio, &self.config, &self.params)?,
            Mode::Tone => start_tone(audio, &self.params)?,
        };
        self.session = Some(session);

        info!(?mode, rate = self.params.rate(), frequency = self.params.frequency(), "playback started");
        Ok(())
    }

    /// Stop playback and return to idle. A no-op while idle.
    ///
    /// Never fails: release problems are logged. A pulse already handed to
    /// the audio path may still sound once after this returns.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let Some(audio) = self.audio.as_mut() else {
            return;
        };

        let released = match session {
            Session::Metronome { mut timer } => {
                let cancelled = timer.cancel();
                audio.lane.lock().schedule = None;
                audio.beat.disarm();
                cancelled
            }
            Session::Tone => silence_tone(audio)
                .map_err(|e| Error::ResourceRelease(format!("could not reset tone nodes: {e}"))),
        };

        if let Err(e) = released {
            warn!(error = %e, "playback stopped with errors");
        }
        info!("playback stopped");
    }

    /// Set the metronome rate in BPM. Applies from the next uncommitted beat.
    pub fn set_rate(&mut self, bpm: f32) -> Result<()> {
        self.params.set_rate(bpm)
    }

    /// Set the tone frequency in Hz. Retunes the running tone in place.
    pub fn set_frequency(&mut self, hz: f32) -> Result<()> {
        self.params.set_frequency(hz)?;
        match (self.state(), self.audio.as_mut()) {
            (PlaybackState::ToneActive, Some(audio)) => send(&mut audio.tone, SineMessage::SetFrequency(hz)),
            _ => Ok(()),
        }
    }

    /// Set the volume in `[0, 1]`. The running tone follows immediately;
    /// metronome beats pick it up when they are committed.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.params.set_volume(volume)?;
        match (self.state(), self.audio.as_mut()) {
            (PlaybackState::ToneActive, Some(audio)) => send(&mut audio.tone_gain, GainMessage::SetGain(volume)),
            _ => Ok(()),
        }
    }

    /// Per-display-frame pull. `None` once playback is idle, which is the
    /// render loop's cue to stop requesting frames.
    pub fn frame(&mut self, now: Instant) -> Option<Frame<'_>> {
        let state = self.state();
        let audio = self.audio.as_mut()?;
        match state {
            PlaybackState::Idle => None,
            PlaybackState::Playing => Some(audio.visuals.pulse(now)),
            PlaybackState::ToneActive => Some(audio.visuals.waveform()),
        }
    }

    /// Stop, then close the clock and the output. The next `start()` opens
    /// a fresh output.
    pub fn shutdown(&mut self) {
        self.stop();
        let Some(audio) = self.audio.take() else {
            return;
        };
        if let Err(e) = audio.clock.close() {
            warn!(error = %e, "failed to close audio clock");
        }
        if let Err(e) = self.output.close() {
            warn!(error = %e, "failed to close audio output");
        }
        info!("audio output closed");
    }

    fn open_audio(&mut self) -> Result<()> {
        if self.audio.is_some() {
            return Ok(());
        }

        let engine = self.output.open(&self.config)?;
        let AudioEngine { clock, beat, pulse, pulse_drops, tone, tone_gain, tone_gate, scope, scope_reader } = engine;
        debug!(sample_rate = clock.sample_rate(), "audio output opened");

        let visuals = Visuals::new(beat.clone(), self.config.beat_decay, self.config.waveform_len, scope_reader);
        let lane = Lane {
            schedule: None,
            sink: PulseSink::new(pulse, self.params.clone()).with_drop_counter(pulse_drops),
        };

        self.audio = Some(Audio {
            clock,
            beat,
            tone,
            tone_gain,
            tone_gate,
            scope,
            lane: Arc::new(Mutex::new(lane)),
            visuals,
        });
        Ok(())
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn start_metronome(audio: &mut Audio, config: &Config, params: &Arc<Parameters>) -> Result<Session> {
    audio.beat.arm();

    {
        let mut lane = audio.lane.lock();
        let Lane { schedule, sink } = &mut *lane;

        let mut scheduler = LookaheadScheduler::new(config);
        scheduler.start(&audio.clock, config.lead_in.as_secs_f64());
        // First wake runs now rather than one interval from now
        scheduler.on_wake(&audio.clock, sink, params);
        *schedule = Some(scheduler);
    }

    let lane = audio.lane.clone();
    let clock = audio.clock.clone();
    let params = params.clone();
    let timer = WakeTimer::spawn(config.wake_interval, move || {
        let mut lane = lane.lock();
        let Lane { schedule, sink } = &mut *lane;
        if let Some(scheduler) = schedule.as_mut() {
            scheduler.on_wake(&clock, sink, &params);
        }
    });

    match timer {
        Ok(timer) => Ok(Session::Metronome { timer }),
        Err(e) => {
            audio.lane.lock().schedule = None;
            audio.beat.disarm();
            Err(e)
        }
    }
}

fn start_tone(audio: &mut Audio, params: &Parameters) -> Result<Session> {
    audio.visuals.reset_waveform();

    let queued = send(&mut audio.tone, SineMessage::ResetPhase)
        .and_then(|_| send(&mut audio.tone, SineMessage::SetFrequency(params.frequency())))
        .and_then(|_| send(&mut audio.tone_gain, GainMessage::SetGain(params.volume())))
        .and_then(|_| send(&mut audio.scope, ScopeMessage::Enable(true)));

    if let Err(e) = queued {
        if let Err(cleanup) = silence_tone(audio) {
            debug!(error = %cleanup, "tone nodes not fully reset after failed start");
        }
        return Err(e);
    }

    // Opened last, so a partial start never becomes audible
    audio.tone_gate.store(true, Ordering::Release);
    Ok(Session::Tone)
}

/// Close the tone gate, then ask the nodes to reset. The gate alone
/// silences the tone; the messages only fail if their queues are full.
fn silence_tone(audio: &mut Audio) -> Result<()> {
    audio.tone_gate.store(false, Ordering::Release);
    let gain = send(&mut audio.tone_gain, GainMessage::SetGain(0.0));
    let scope = send(&mut audio.scope, ScopeMessage::Enable(false));
    gain.and(scope)
}

fn send<M: Send + 'static>(handle: &mut Handle<M>, msg: M) -> Result<()> {
    handle.send(msg).map_err(|_| Error::QueueFull)
}
