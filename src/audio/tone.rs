//! Tones and the note table.

use crate::error::{Error, Result};

/// A single tone: a frequency held for a number of milliseconds.
/// Can only be built with a positive, finite frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    frequency: f32,
    duration_ms: u32,
}

impl Tone {
    pub fn new(frequency: f32, duration_ms: u32) -> Result<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(Error::InvalidTone {
                frequency,
                duration_ms,
            });
        }

        Ok(Self {
            frequency,
            duration_ms,
        })
    }

    /// Only used by the note table, where every frequency is a known positive constant.
    const fn note(frequency: f32, duration_ms: u32) -> Self {
        Self {
            frequency,
            duration_ms,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Same tone, `octaves` octaves up.
    pub fn higher_octaves(self, octaves: u32) -> Self {
        Self {
            frequency: self.frequency * 2_f32.powi(octaves as i32),
            ..self
        }
    }

    /// Same tone, `octaves` octaves down.
    pub fn lower_octaves(self, octaves: u32) -> Self {
        Self {
            frequency: self.frequency / 2_f32.powi(octaves as i32),
            ..self
        }
    }

    /// Same frequency with a different length.
    pub fn with_duration(self, duration_ms: u32) -> Self {
        Self {
            duration_ms,
            ..self
        }
    }
}

/// Fourth octave of 12-tone equal temperament (A4 = 440Hz).
/// Values are rounded to two decimals.
pub mod note {
    use super::Tone;

    pub const C4: f32 = 261.63;
    pub const CSHARP4: f32 = 277.18;
    pub const D4: f32 = 293.66;
    pub const DSHARP4: f32 = 311.13;
    pub const E4: f32 = 329.63;
    pub const F4: f32 = 349.23;
    pub const FSHARP4: f32 = 369.99;
    pub const G4: f32 = 392.00;
    pub const GSHARP4: f32 = 415.30;
    pub const A4: f32 = 440.00;
    pub const ASHARP4: f32 = 466.16;
    pub const B4: f32 = 493.88;

    pub const fn c(duration_ms: u32) -> Tone {
        Tone::note(C4, duration_ms)
    }

    pub const fn c_sharp(duration_ms: u32) -> Tone {
        Tone::note(CSHARP4, duration_ms)
    }

    pub const fn d_flat(duration_ms: u32) -> Tone {
        c_sharp(duration_ms)
    }

    pub const fn d(duration_ms: u32) -> Tone {
        Tone::note(D4, duration_ms)
    }

    pub const fn d_sharp(duration_ms: u32) -> Tone {
        Tone::note(DSHARP4, duration_ms)
    }

    pub const fn e_flat(duration_ms: u32) -> Tone {
        d_sharp(duration_ms)
    }

    pub const fn e(duration_ms: u32) -> Tone {
        Tone::note(E4, duration_ms)
    }

    pub const fn f(duration_ms: u32) -> Tone {
        Tone::note(F4, duration_ms)
    }

    pub const fn f_sharp(duration_ms: u32) -> Tone {
        Tone::note(FSHARP4, duration_ms)
    }

    pub const fn g_flat(duration_ms: u32) -> Tone {
        f_sharp(duration_ms)
    }

    pub const fn g(duration_ms: u32) -> Tone {
        Tone::note(G4, duration_ms)
    }

    pub const fn g_sharp(duration_ms: u32) -> Tone {
        Tone::note(GSHARP4, duration_ms)
    }

    pub const fn a_flat(duration_ms: u32) -> Tone {
        g_sharp(duration_ms)
    }

    pub const fn a(duration_ms: u32) -> Tone {
        Tone::note(A4, duration_ms)
    }

    pub const fn a_sharp(duration_ms: u32) -> Tone {
        Tone::note(ASHARP4, duration_ms)
    }

    pub const fn b_flat(duration_ms: u32) -> Tone {
        a_sharp(duration_ms)
    }

    pub const fn b(duration_ms: u32) -> Tone {
        Tone::note(B4, duration_ms)
    }

    /// The C major scale, one tone per note.
    pub fn c_major(duration_ms: u32) -> [Tone; 8] {
        [
            c(duration_ms),
            d(duration_ms),
            e(duration_ms),
            f(duration_ms),
            g(duration_ms),
            a(duration_ms),
            b(duration_ms),
            c(duration_ms).higher_octaves(1),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::{note, Tone};

    #[test]
    fn test_note_table() {
        assert_eq!(note::a(100).frequency(), 440.00);
        assert_eq!(note::c(100).frequency(), 261.63);
        assert_eq!(note::d(100).frequency(), 293.66);
        assert_eq!(note::g(100).frequency(), 392.00);
        assert_eq!(note::b(100).frequency(), 493.88);
        assert_eq!(note::d_flat(100), note::c_sharp(100));
        assert_eq!(note::b_flat(100), note::a_sharp(100));
    }

    #[test]
    fn test_octave_shift_keeps_duration() {
        let a = note::a(250);

        let up = a.higher_octaves(1);
        assert_eq!(up.frequency(), 880.0);
        assert_eq!(up.duration_ms(), 250);

        let down = a.lower_octaves(2);
        assert_eq!(down.frequency(), 110.0);
        assert_eq!(down.duration_ms(), 250);

        assert_eq!(a.higher_octaves(0), a);
    }

    #[test]
    fn test_invalid_tone() {
        assert!(Tone::new(0.0, 100).is_err());
        assert!(Tone::new(-440.0, 100).is_err());
        assert!(Tone::new(f32::NAN, 100).is_err());
        assert!(Tone::new(f32::INFINITY, 100).is_err());
        assert!(Tone::new(440.0, 0).is_ok());
    }
}
