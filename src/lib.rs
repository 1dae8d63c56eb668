//! # tilt-tone
//!
//! Audible feedback for a tilt sensor.
//!
//! Orientation readings are turned into tones ([`feedback`]), tones are rendered into
//! click free PCM buffers ([`audio::synth`]) and a single background worker plays them
//! in order on an output device ([`player`]).
//!
//! ```text
//!  orientation ─► LevelListener ─► QueueHandle::queue ─► PlaybackQueue
//!                                                            │ (FIFO)
//!                                                            ▼
//!                                     worker: synthesize ─► PlaybackSession ─► device
//! ```

pub mod audio;
pub mod error;
pub mod feedback;
pub mod misc;
pub mod player;

pub use error::{DeviceError, Error, Result};
pub use player::{BackgroundPlayer, PlayerConfig, QueueHandle};

pub mod constants {
    /// Rate every buffer is synthesized and played at.
    pub const SAMPLE_RATE: u32 = 44100;
}
