//! CPAL device discovery and the real-time output.
//!
//! ```no_run
//! use taktgeber::{CpalDevice, CpalOutput, Mode, PlaybackController};
//!
//! for device in CpalDevice::list_outputs() {
//!     println!("{}: {} Hz, {} ch", device.name(), device.sample_rate(), device.channels());
//! }
//!
//! let mut controller = PlaybackController::new(CpalOutput::default_device());
//! controller.start(Mode::Metronome).expect("no audio output");
//! ```

use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig};
use crossbeam_channel::Sender;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::{AudioEngine, AudioPath};
use crate::error::{Error, Result};
use crate::output::AudioOutput;

/// A discovered audio output device.
pub struct CpalDevice {
    device: cpal::Device,
    config: SupportedStreamConfig,

    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    /// Get the system's default output device.
    pub fn default_output() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::ClockUnavailable("no default output device".into()))?;
        Self::from_device(device)
    }

    /// List all available audio output devices.
    ///
    /// Returns an empty list if no devices are found or if enumeration fails.
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(|device| Self::from_device(device).ok()).collect())
            .unwrap_or_default()
    }

    fn from_device(device: cpal::Device) -> Result<Self> {
        let config = device
            .default_output_config()
            .map_err(|e| Error::ClockUnavailable(e.to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        Ok(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Plays the audio path on a CPAL device.
///
/// The stream is built and kept on a dedicated thread (streams are not
/// `Send` on every platform); the audio callback renders straight from the
/// path, so the clock counts frames as the device consumes them.
pub struct CpalOutput {
    device: Option<CpalDevice>,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Output to the system default device, resolved on first open.
    pub fn default_device() -> Self {
        Self {
            device: None,
            shutdown: None,
            thread: None,
        }
    }

    /// Output to a specific device.
    pub fn new(device: CpalDevice) -> Self {
        Self {
            device: Some(device),
            shutdown: None,
            thread: None,
        }
    }
}

impl AudioOutput for CpalOutput {
    fn open(&mut self, config: &Config) -> Result<AudioEngine> {
        if self.thread.is_some() {
            return Err(Error::ClockUnavailable("output is already open".into()));
        }

        let device = match self.device.take() {
            Some(device) => device,
            None => CpalDevice::default_output()?,
        };
        info!(device = device.name(), sample_rate = device.sample_rate(), "opening audio output");

        let (engine, path) = AudioEngine::new(device.sample_rate(), config);

        let (shutdown, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        let thread = thread::Builder::new()
            .name("taktgeber-audio".into())
            .spawn(move || {
                let stream = match build_stream(&device, path) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(Error::ClockUnavailable(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive until the output is closed
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| Error::ClockUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.shutdown = Some(shutdown);
                self.thread = Some(thread);
                Ok(engine)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::ClockUnavailable("audio thread exited during setup".into()))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        drop(self.shutdown.take());
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::ResourceRelease("audio thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn build_stream(device: &CpalDevice, mut path: AudioPath) -> Result<cpal::Stream> {
    let stream_config = device.config.config();
    let channels = stream_config.channels as usize;
    let on_error = |err: cpal::StreamError| error!(error = %err, "CPAL stream error");

    let stream = match device.config.sample_format() {
        SampleFormat::F32 => device.device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| path.render(data, channels, |s| s),
            on_error,
            None,
        ),
        SampleFormat::I16 => device.device.build_output_stream(
            &stream_config,
            move |data: &mut [i16], _| {
                path.render(data, channels, |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            },
            on_error,
            None,
        ),
        SampleFormat::U16 => device.device.build_output_stream(
            &stream_config,
            move |data: &mut [u16], _| {
                path.render(data, channels, |s| ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16)
            },
            on_error,
            None,
        ),
        other => {
            return Err(Error::ClockUnavailable(format!("unsupported sample format: {other:?}")));
        }
    };

    stream.map_err(|e| Error::ClockUnavailable(e.to_string()))
}
