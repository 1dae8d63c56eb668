//! Audio utilities.
//! Tone model, synthesis and the output device boundary.

pub mod devices;
pub mod output;
pub mod sequence;
pub mod session;
pub mod synth;
pub mod tone;

pub use sequence::{parse_sequence, PlayableItem};
pub use session::{AudioTrack, BoxedDevice, OutputDevice, PlaybackSession, StreamFormat};
pub use tone::{note, Tone};
