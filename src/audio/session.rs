//! Output device boundary and playback sessions.

use std::time::{Duration, Instant};

use crate::error::DeviceError;

pub type BoxedDevice = Box<dyn OutputDevice + Send + 'static>;
pub type BoxedTrack = Box<dyn AudioTrack + 'static>;

/// The fixed format every buffer is played in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Frames per second.
    pub sample_rate: u32,
}

impl StreamFormat {
    /// Always one channel.
    pub const CHANNELS: u16 = 1;

    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Time it takes to play `frames` frames.
    pub fn duration_of(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Something that can open tracks for mono 16-bit PCM.
pub trait OutputDevice {
    fn name(&self) -> String;

    /// Open a track that will hold `frames` frames.
    fn open(&mut self, format: StreamFormat, frames: usize) -> Result<BoxedTrack, DeviceError>;
}

/// One open track on an output device.
/// Tracks are created and dropped on the thread that plays them.
pub trait AudioTrack {
    /// Copies samples into the track, returning how many were accepted.
    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError>;
    fn play(&mut self) -> Result<(), DeviceError>;
    /// Frames played so far. Never goes down.
    fn playback_position(&self) -> usize;
    fn stop(&mut self);
    fn release(&mut self);
}

/// One synthesized buffer playing on an open track.
/// Owned by the worker that opened it and released exactly once.
pub struct PlaybackSession {
    track: BoxedTrack,
    frames: usize,
    started: Instant,
    expected: Duration,
}

impl PlaybackSession {
    /// Writes the buffer to a new track and starts it.
    pub fn open(
        device: &mut dyn OutputDevice,
        format: StreamFormat,
        buffer: &[i16],
    ) -> Result<Self, DeviceError> {
        let mut track = device.open(format, buffer.len())?;

        let written = match track.write(buffer) {
            Ok(n) => n,
            Err(e) => {
                track.release();
                return Err(e);
            }
        };
        if written < buffer.len() {
            track.release();
            return Err(DeviceError::Write {
                written,
                expected: buffer.len(),
            });
        }

        if let Err(e) = track.play() {
            track.release();
            return Err(e);
        }

        Ok(Self {
            track,
            frames: buffer.len(),
            started: Instant::now(),
            expected: format.duration_of(buffer.len()),
        })
    }

    /// True while the device cursor is short of the end of the buffer.
    pub fn is_playing(&self) -> bool {
        self.track.playback_position() < self.frames
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Real time the buffer should take to play.
    pub fn expected_duration(&self) -> Duration {
        self.expected
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Polls until the buffer has played out, sleeping `poll` between checks.
    /// Returns false if the device is still short of the end after `grace` past the expected duration.
    pub fn wait(&self, poll: Duration, grace: Duration) -> bool {
        let deadline = self.expected + grace;
        while self.is_playing() {
            if self.elapsed() > deadline {
                return false;
            }
            std::thread::sleep(poll);
        }

        true
    }

    /// Stops and frees the track.
    pub fn release(mut self) {
        self.track.stop();
        self.track.release();
    }
}
