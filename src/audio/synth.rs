//! Waveform synthesis.
//! Turns an ordered list of tones into one precomputed 16-bit PCM buffer.
//!
//! The amplitude ramps linearly over a [`fade_window`] at the start and end of the buffer
//! and around every boundary between two tones.
//! This removes clicks, and leaves a short dip to silence between tones in a composite.

use std::f64::consts::PI;

use crate::error::{Error, Result};

use super::tone::Tone;

/// Peak sample value before the envelope is applied.
pub const MAX_AMPLITUDE: f64 = i16::MAX as f64;

/// Number of samples covering `duration_ms` (floored).
pub fn samples_for_ms(duration_ms: u64, sample_rate: u32) -> usize {
    (duration_ms * sample_rate as u64 / 1000) as usize
}

/// Length of the fade ramp, 100ms worth of samples.
pub fn fade_window(sample_rate: u32) -> usize {
    sample_rate as usize / 10
}

/// Sample indices where a tone starts or ends.
/// Always starts with 0 and ends with the buffer length.
pub fn boundaries(tones: &[Tone], sample_rate: u32) -> Vec<usize> {
    let mut out = Vec::with_capacity(tones.len() + 2);
    out.push(0);

    let mut acc = 0;
    for tone in tones {
        acc += samples_for_ms(tone.duration_ms().into(), sample_rate);
        out.push(acc);
    }

    // Per-tone flooring can leave the last boundary short of the buffer end
    let total_ms = tones.iter().map(|x| u64::from(x.duration_ms())).sum();
    let total = samples_for_ms(total_ms, sample_rate);
    if out.last() != Some(&total) {
        out.push(total);
    }

    out
}

/// Index of the tone playing at sample `i`.
/// That is the first tone whose end is past `i`, or the last tone past the end of every tone.
pub fn active_tone(bounds: &[usize], tones: usize, i: usize) -> usize {
    let ends = bounds.get(1..=tones).unwrap_or_default();
    ends.partition_point(|&end| end <= i).min(tones.saturating_sub(1))
}

/// Renders the tones back to back into a single buffer.
pub fn synthesize(tones: &[Tone], sample_rate: u32) -> Result<Vec<i16>> {
    if tones.is_empty() {
        return Err(Error::EmptyComposite);
    }
    if sample_rate == 0 {
        return Err(Error::InvalidSampleRate);
    }

    let bounds = boundaries(tones, sample_rate);
    let count = *bounds.last().unwrap_or(&0);
    let sr = sample_rate as f64;

    let mut buffer = Vec::with_capacity(count);
    let envelope = Envelope::new(bounds.clone(), fade_window(sample_rate));
    for (i, coef) in envelope.enumerate() {
        let tone = &tones[active_tone(&bounds, tones.len(), i)];
        let period = sr / tone.frequency() as f64;
        let raw = coef as f64 * MAX_AMPLITUDE * (2.0 * PI * i as f64 / period).sin();
        buffer.push(raw.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    Ok(buffer)
}

/// Fade coefficient for each sample, between 0 and 1.
/// The coefficient is the distance to the nearest boundary over the fade window, capped at 1.
pub struct Envelope {
    bounds: Vec<usize>,
    window: usize,
    i: usize,
    // Index of the last boundary at or before `i`
    prev: usize,
}

impl Envelope {
    /// `bounds` must be sorted, the last one is the buffer length.
    pub fn new(bounds: Vec<usize>, window: usize) -> Self {
        Self {
            bounds,
            window,
            i: 0,
            prev: 0,
        }
    }

    fn len(&self) -> usize {
        self.bounds.last().copied().unwrap_or(0)
    }
}

impl Iterator for Envelope {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.len() {
            return None;
        }

        let i = self.i;
        self.i += 1;

        while self.prev + 1 < self.bounds.len() && self.bounds[self.prev + 1] <= i {
            self.prev += 1;
        }

        if self.window == 0 {
            return Some(1.0);
        }

        let before = i - self.bounds[self.prev];
        let after = self
            .bounds
            .get(self.prev + 1)
            .map_or(usize::MAX, |&next| next - i);
        let distance = before.min(after).min(self.window);

        Some((distance as f32 / self.window as f32).clamp(0.0, 1.0))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len().saturating_sub(self.i);
        (left, Some(left))
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use std::f64::consts::PI;

    use super::{active_tone, boundaries, fade_window, synthesize, Envelope, MAX_AMPLITUDE};
    use crate::audio::tone::{note, Tone};

    const SR: u32 = 44100;

    fn peak(samples: &[i16]) -> i32 {
        samples.iter().map(|x| (*x as i32).abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_single_tone() {
        let buf = synthesize(&[Tone::new(440.0, 500).unwrap()], SR).unwrap();
        assert_eq!(buf.len(), 22050);

        // Start and end sit inside the fade ramp
        assert!(buf[0].abs() < 10);
        assert!(buf[22049].abs() < 10);

        // One full period around the middle reaches the top of the range
        let mid = peak(&buf[11025 - 100..11025 + 100]);
        assert!(mid as f64 > MAX_AMPLITUDE * 0.99, "{mid}");
    }

    #[test]
    fn test_fade_ramp() {
        let buf = synthesize(&[note::a(1000)], SR).unwrap();
        let window = fade_window(SR);

        // Peaks grow through the fade in
        let early = peak(&buf[0..window / 4]);
        let later = peak(&buf[window / 2..window * 3 / 4]);
        assert!(early < later);
        assert!((later as f64) < MAX_AMPLITUDE * 0.8);
    }

    #[test]
    fn test_composite_seam() {
        let buf = synthesize(&[note::c(500), note::d(500)], SR).unwrap();
        assert_eq!(buf.len(), 44100);
        assert_eq!(buf[22050], 0);

        // Quiet right around the seam, loud away from it
        assert!(peak(&buf[22050 - 20..22050 + 20]) < 500);
        assert!(peak(&buf[11025 - 200..11025 + 200]) as f64 > MAX_AMPLITUDE * 0.95);
        assert!(peak(&buf[33075 - 200..33075 + 200]) as f64 > MAX_AMPLITUDE * 0.95);
    }

    #[test]
    fn test_composite_frequencies() {
        let tones = [note::c(500), note::d(500)];
        let buf = synthesize(&tones, SR).unwrap();
        let coefs = Envelope::new(boundaries(&tones, SR), fade_window(SR)).collect::<Vec<_>>();

        let expected = |i: usize, tone: &Tone| {
            let period = SR as f64 / tone.frequency() as f64;
            let raw = coefs[i] as f64 * MAX_AMPLITUDE * (2.0 * PI * i as f64 / period).sin();
            raw.round() as i16
        };

        for i in [3000, 11025, 15001, 22049] {
            assert_eq!(buf[i], expected(i, &tones[0]), "sample {i}");
        }
        for i in [22051, 30000, 33075, 44099] {
            assert_eq!(buf[i], expected(i, &tones[1]), "sample {i}");
        }

        // The halves really differ, so the wrong tone would be caught
        assert_ne!(expected(11025, &tones[0]), expected(11025, &tones[1]));
        assert_ne!(expected(33075, &tones[0]), expected(33075, &tones[1]));
    }

    #[test]
    fn test_active_tone() {
        let bounds = boundaries(&[note::c(15), note::e(15)], 22050);
        assert_eq!(bounds, vec![0, 330, 660, 661]);

        assert_eq!(active_tone(&bounds, 2, 0), 0);
        assert_eq!(active_tone(&bounds, 2, 329), 0);
        assert_eq!(active_tone(&bounds, 2, 330), 1);
        assert_eq!(active_tone(&bounds, 2, 659), 1);
        // Past the last tone's end the last tone keeps playing
        assert_eq!(active_tone(&bounds, 2, 660), 1);

        let single = boundaries(&[note::a(10)], SR);
        assert_eq!(active_tone(&single, 1, 0), 0);
        assert_eq!(active_tone(&single, 1, 440), 0);
    }

    #[test]
    fn test_long_durations() {
        let tones = [note::a(u32::MAX), note::a(u32::MAX)];
        let total = 2 * u32::MAX as u64;
        assert_eq!(
            boundaries(&tones, 1000),
            vec![0, u32::MAX as usize, total as usize]
        );
    }

    #[test]
    fn test_envelope_coefficients() {
        let bounds = boundaries(&[note::c(500), note::d(500)], SR);
        assert_eq!(bounds, vec![0, 22050, 44100]);

        let coefs = Envelope::new(bounds, fade_window(SR)).collect::<Vec<_>>();
        assert_eq!(coefs.len(), 44100);
        assert_eq!(coefs[0], 0.0);
        assert_eq!(coefs[22050], 0.0);
        assert_eq!(coefs[4410], 1.0);
        assert_eq!(coefs[11025], 1.0);
        assert!((coefs[2205] - 0.5).abs() < 1e-6);
        assert!((coefs[22050 - 2205] - 0.5).abs() < 1e-6);
        assert!((coefs[44099] - 1.0 / 4410.0).abs() < 1e-6);
    }

    #[test]
    fn test_boundaries_rounding() {
        // 3ms at 1000Hz is exact, at 44100Hz the parts floor below the total
        let tones = [note::a(1), note::a(1), note::a(1)];
        assert_eq!(boundaries(&tones, 1000), vec![0, 1, 2, 3]);
        assert_eq!(boundaries(&tones, 44100), vec![0, 44, 88, 132]);
        assert_eq!(
            boundaries(&[note::a(15), note::a(15)], 22050),
            vec![0, 330, 660, 661]
        );
        assert_eq!(synthesize(&tones, 44100).unwrap().len(), 132);
    }

    #[test]
    fn test_invalid_input() {
        assert!(synthesize(&[], SR).is_err());
        assert!(synthesize(&[note::a(10)], 0).is_err());
        assert!(synthesize(&[note::a(0)], SR).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn buffer_length_matches_duration(
            parts in prop::collection::vec((20.0f32..8000.0, 0u32..400), 1..6),
            sample_rate in prop::sample::select(vec![8000u32, 22050, 44100, 48000]),
        ) {
            let tones = parts
                .iter()
                .map(|&(f, d)| Tone::new(f, d).unwrap())
                .collect::<Vec<_>>();
            let total = parts.iter().map(|x| x.1 as u64).sum::<u64>();

            let buf = synthesize(&tones, sample_rate).unwrap();
            prop_assert_eq!(buf.len() as u64, total * sample_rate as u64 / 1000);
        }
    }
}
