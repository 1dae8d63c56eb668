//! Playable items and the text sequence format.

use std::time::Duration;

use crate::error::{Error, Result};

use super::tone::Tone;

/// The unit placed on the playback queue.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayableItem {
    /// One tone in its own buffer.
    SingleTone(Tone),
    /// Tones played back to back as one continuous buffer.
    /// Never empty, see [`PlayableItem::composite`].
    Composite(Vec<Tone>),
    /// A timed pause, nothing is sent to the device.
    Silence { duration_ms: u32 },
}

impl PlayableItem {
    pub fn tone(tone: Tone) -> Self {
        Self::SingleTone(tone)
    }

    pub fn composite(tones: impl IntoIterator<Item = Tone>) -> Result<Self> {
        let tones = tones.into_iter().collect::<Vec<_>>();
        if tones.is_empty() {
            return Err(Error::EmptyComposite);
        }

        Ok(Self::Composite(tones))
    }

    pub fn silence(duration_ms: u32) -> Self {
        Self::Silence { duration_ms }
    }

    /// Total playing time of the item.
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::SingleTone(tone) => tone.duration_ms().into(),
            Self::Composite(tones) => tones.iter().map(|x| u64::from(x.duration_ms())).sum(),
            Self::Silence { duration_ms } => (*duration_ms).into(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms())
    }

    /// The tones that make up this item's buffer.
    /// Empty for silence.
    pub fn tones(&self) -> &[Tone] {
        match self {
            Self::SingleTone(tone) => std::slice::from_ref(tone),
            Self::Composite(tones) => tones,
            Self::Silence { .. } => &[],
        }
    }

    /// Parse a sequence that has to fit in a single item.
    /// Fails if the text describes anything other than exactly one item.
    pub fn from_seq(seq: &str) -> Result<Self> {
        let mut items = parse_sequence(seq)?;
        match items.len() {
            1 => Ok(items.remove(0)),
            n => Err(Error::Sequence {
                line: 0,
                reason: format!("expected one item, found {n}"),
            }),
        }
    }
}

impl From<Tone> for PlayableItem {
    fn from(tone: Tone) -> Self {
        Self::SingleTone(tone)
    }
}

/// Parse a sequence description into queueable items.
/// The format is one segment per line:
/// ```text
/// Freq;time(ms)
/// 440;500
/// 0;250
/// ```
/// A frequency of `0` or `-` is a silence.
/// Consecutive tones are joined into a composite, silences split them.
pub fn parse_sequence(seq: &str) -> Result<Vec<PlayableItem>> {
    let mut items = Vec::new();
    let mut run = Vec::new();

    for (i, line) in seq.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }

        let err = |reason: String| Error::Sequence { line: i, reason };
        let (freq, time) = line
            .split_once(';')
            .ok_or_else(|| err("missing `;` separator".to_owned()))?;
        let time = time
            .trim()
            .parse::<u32>()
            .map_err(|e| err(format!("bad duration `{}`: {e}", time.trim())))?;

        let freq = freq.trim();
        if freq == "-" || freq == "0" {
            flush_run(&mut run, &mut items);
            items.push(PlayableItem::silence(time));
            continue;
        }

        let freq = freq
            .parse::<f32>()
            .map_err(|e| err(format!("bad frequency `{freq}`: {e}")))?;
        run.push(Tone::new(freq, time).map_err(|e| err(e.to_string()))?);
    }

    flush_run(&mut run, &mut items);
    Ok(items)
}

fn flush_run(run: &mut Vec<Tone>, items: &mut Vec<PlayableItem>) {
    match run.len() {
        0 => {}
        1 => items.push(PlayableItem::SingleTone(run[0])),
        _ => items.push(PlayableItem::Composite(std::mem::take(run))),
    }
    run.clear();
}
