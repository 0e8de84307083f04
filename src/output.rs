//! Audio outputs: whatever pulls samples from the [`AudioPath`] and thereby
//! drives the clock.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::{AudioEngine, AudioPath};
use crate::error::{Error, Result};

/// An audio-capable output subsystem.
///
/// `open` is called once, on the first start: it builds the engine at the
/// output's sample rate, keeps the render half and returns the control
/// half. Failing to open means there is no clock to schedule against.
pub trait AudioOutput: Send {
    fn open(&mut self, config: &Config) -> Result<AudioEngine>;

    /// Stop pulling audio and release the device. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Output that renders only when asked to.
///
/// Clones share the same path, so one clone can be handed to a
/// [`PlaybackController`](crate::PlaybackController) while another renders
/// audio (and advances the clock) from a test or an offline bounce.
#[derive(Clone, Default)]
pub struct OfflineOutput {
    path: Arc<Mutex<Option<AudioPath>>>,
}

impl OfflineOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.path.lock().is_some()
    }

    /// Render `frames` mono frames. Empty if the output is not open.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut guard = self.path.lock();
        let Some(path) = guard.as_mut() else {
            return Vec::new();
        };
        let mut data = vec![0.0; frames];
        path.render_mono(&mut data);
        data
    }

    /// Render `seconds` worth of audio at the path's sample rate.
    pub fn render_secs(&self, seconds: f64) -> Vec<f32> {
        let rate = match self.path.lock().as_ref() {
            Some(path) => path.sample_rate(),
            None => return Vec::new(),
        };
        self.render((seconds.max(0.0) * rate as f64).round() as usize)
    }
}

impl AudioOutput for OfflineOutput {
    fn open(&mut self, config: &Config) -> Result<AudioEngine> {
        let mut slot = self.path.lock();
        if slot.is_some() {
            return Err(Error::ClockUnavailable("offline output is already open".into()));
        }
        let (engine, path) = AudioEngine::new(config.sample_rate, config);
        *slot = Some(path);
        Ok(engine)
    }

    fn close(&mut self) -> Result<()> {
        self.path.lock().take();
        Ok(())
    }
}
