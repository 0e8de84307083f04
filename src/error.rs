//! Error types

use thiserror::Error;

/// Everything that can go wrong between the controller and the audio path.
///
/// None of these are fatal: [`PlaybackController::stop`](crate::PlaybackController::stop)
/// always settles into [`PlaybackState::Idle`](crate::PlaybackState::Idle).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The audio output could not be opened, or its clock was already closed.
    #[error("audio clock unavailable: {0}")]
    ClockUnavailable(String),

    /// The wake timer thread could not be started.
    #[error("failed to start wake timer: {0}")]
    TimerUnavailable(String),

    /// A parameter setter was given a value outside its domain.
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    /// Tearing down audio resources failed. Logged and swallowed by `stop()`.
    #[error("failed to release audio resources: {0}")]
    ResourceRelease(String),

    /// The message queue towards the audio thread was full.
    #[error("message queue to the audio thread is full")]
    QueueFull,
}

pub type Result<T> = core::result::Result<T, Error>;
