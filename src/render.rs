//! Per-display-frame visuals.
//!
//! The render side never blocks on or polls the audio thread: it reads the
//! [`BeatSignal`] slot and drains whatever the scope tap has produced since
//! the previous frame.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rtrb::Consumer;

use crate::beat::BeatSignal;
use crate::controller::PlaybackController;

/// What to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame<'a> {
    /// Metronome: scale the pulsing indicator by `decay` (1 at a beat,
    /// fading to 0).
    Pulse { decay: f32 },
    /// Tone: the most recent window of the live waveform, oldest first.
    Waveform { samples: &'a [f32] },
}

/// Fixed-length window over the newest scope samples.
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Vec<f32>,
}

impl Waveform {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len.max(1)],
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Pull everything the reader has and keep the newest `len` samples.
    /// Returns how many samples were read.
    pub fn drain_from(&mut self, reader: &mut Consumer<f32>) -> usize {
        let available = reader.slots();
        if available == 0 {
            return 0;
        }

        let len = self.samples.len();
        let Ok(chunk) = reader.read_chunk(available) else {
            return 0;
        };
        let (first, second) = chunk.as_slices();

        let keep = available.min(len);
        self.samples.copy_within(keep.., 0);

        // Newest `keep` samples of first ++ second
        let tail = &mut self.samples[len - keep..];
        let skip = available - keep;
        let mut written = 0;
        for &s in first.iter().chain(second.iter()).skip(skip) {
            tail[written] = s;
            written += 1;
        }

        chunk.commit_all();
        available
    }
}

/// Per-frame state: the beat slot for the metronome, the waveform window
/// for the tone.
pub(crate) struct Visuals {
    beat: Arc<BeatSignal>,
    beat_decay: Duration,
    waveform: Waveform,
    scope_reader: Consumer<f32>,
}

impl Visuals {
    pub fn new(beat: Arc<BeatSignal>, beat_decay: Duration, waveform_len: usize, scope_reader: Consumer<f32>) -> Self {
        Self {
            beat,
            beat_decay,
            waveform: Waveform::new(waveform_len),
            scope_reader,
        }
    }

    pub fn pulse(&self, now: Instant) -> Frame<'_> {
        Frame::Pulse {
            decay: self.beat.decay(now, self.beat_decay),
        }
    }

    pub fn waveform(&mut self) -> Frame<'_> {
        self.waveform.drain_from(&mut self.scope_reader);
        Frame::Waveform {
            samples: self.waveform.samples(),
        }
    }

    /// Forget the previous session's waveform, including anything the scope
    /// produced after it was disabled.
    pub fn reset_waveform(&mut self) {
        let stale = self.scope_reader.slots();
        if let Ok(chunk) = self.scope_reader.read_chunk(stale) {
            chunk.commit_all();
        }
        self.waveform.clear();
    }
}

/// Drives [`PlaybackController::frame`] at a fixed cadence.
///
/// Stands in for a display-refresh callback: call [`run`](Self::run) on the
/// thread that draws.
#[derive(Debug, Clone, Copy)]
pub struct RenderLoop {
    interval: Duration,
}

impl RenderLoop {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pull and draw frames until playback leaves its active state or
    /// `draw` breaks. Returns the number of frames drawn.
    pub fn run<F>(&self, controller: &mut PlaybackController, mut draw: F) -> u64
    where
        F: FnMut(Frame<'_>) -> ControlFlow<()>,
    {
        let mut drawn = 0;
        let mut next = Instant::now();

        loop {
            let Some(frame) = controller.frame(Instant::now()) else {
                break;
            };
            drawn += 1;
            if draw(frame).is_break() {
                break;
            }

            next += self.interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Fell behind; don't try to catch up on missed frames
                next = now;
            }
        }

        drawn
    }
}
