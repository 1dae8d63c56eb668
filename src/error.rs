//! Error types for the tone sequencer.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tone: {frequency}Hz for {duration_ms}ms")]
    InvalidTone { frequency: f32, duration_ms: u32 },

    #[error("A composite needs at least one tone")]
    EmptyComposite,

    #[error("Sample rate must be positive")]
    InvalidSampleRate,

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Player already has an active worker")]
    AlreadyRunning,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Invalid sequence line {line}: {reason}")]
    Sequence { line: usize, reason: String },
}

/// Output device errors.
/// These are fatal to the item being played, never to the worker.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Unsupported config: {0}")]
    Config(String),

    #[error("Failed to build stream: {0}")]
    Build(String),

    #[error("Failed to start playback: {0}")]
    Play(String),

    #[error("Short write: {written} of {expected} samples")]
    Write { written: usize, expected: usize },
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
