//! Live parameters shared between the controller and the wake timer.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

/// An `f32` stored as bits in an `AtomicU32`.
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// Rate, frequency and volume.
///
/// Written by the controller only; read lock-free by the scheduler (rate,
/// volume at commit time) and the controller itself. Setters reject values
/// outside their domain and keep the previous value.
#[derive(Debug)]
pub struct Parameters {
    rate: AtomicF32,
    frequency: AtomicF32,
    volume: AtomicF32,
}

impl Parameters {
    pub fn new(rate: f32, frequency: f32, volume: f32) -> Result<Self> {
        let params = Self {
            rate: AtomicF32::new(120.0),
            frequency: AtomicF32::new(440.0),
            volume: AtomicF32::new(0.5),
        };
        params.set_rate(rate)?;
        params.set_frequency(frequency)?;
        params.set_volume(volume)?;
        Ok(params)
    }

    /// Beats per minute.
    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate.load()
    }

    /// Tone frequency in Hz.
    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency.load()
    }

    /// Output volume in `[0, 1]`.
    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume.load()
    }

    /// Seconds between beats at the current rate.
    #[inline]
    pub fn period(&self) -> f64 {
        60.0 / self.rate() as f64
    }

    pub fn set_rate(&self, bpm: f32) -> Result<()> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(Error::InvalidParameter { name: "rate", value: bpm });
        }
        self.rate.store(bpm);
        Ok(())
    }

    pub fn set_frequency(&self, hz: f32) -> Result<()> {
        if !(hz.is_finite() && hz > 0.0) {
            return Err(Error::InvalidParameter { name: "frequency", value: hz });
        }
        self.frequency.store(hz);
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::InvalidParameter { name: "volume", value: volume });
        }
        self.volume.store(volume);
        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            rate: AtomicF32::new(120.0),
            frequency: AtomicF32::new(440.0),
            volume: AtomicF32::new(0.5),
        }
    }
}
