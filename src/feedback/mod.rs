//! Turns orientation readings into feedback.
//!
//! Readings arrive as `(pitch, roll)` in degrees through [`LevelListener`]s.
//! [`ToneFeedback`] maps them to tones on a player queue, [`LevelReading`] to a level bar.

use tracing::trace;

use crate::{
    audio::{
        sequence::PlayableItem,
        tone::{note, Tone},
    },
    error::Result,
    player::QueueHandle,
};

pub mod orientation;

/// Receives orientation readings in degrees.
pub trait LevelListener {
    fn on_level_changed(&mut self, pitch: f32, roll: f32);
}

impl<F: FnMut(f32, f32)> LevelListener for F {
    fn on_level_changed(&mut self, pitch: f32, roll: f32) {
        self(pitch, roll)
    }
}

/// Forwards every reading to each listener, in the order they were added.
#[derive(Default)]
pub struct CompositeLevelListener {
    listeners: Vec<Box<dyn LevelListener + Send>>,
}

impl CompositeLevelListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: impl LevelListener + Send + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn push(&mut self, listener: impl LevelListener + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }
}

impl LevelListener for CompositeLevelListener {
    fn on_level_changed(&mut self, pitch: f32, roll: f32) {
        for i in self.listeners.iter_mut() {
            i.on_level_changed(pitch, roll);
        }
    }
}

/// Zero calibration.
/// Readings are reported relative to the raw reading captured by the last [`ZeroOffset::zero`].
/// Kept in memory only, persisting the offsets is up to the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ZeroOffset {
    zero_pitch: f32,
    zero_roll: f32,
    last_pitch: f32,
    last_roll: f32,
}

impl ZeroOffset {
    /// Starts from previously saved offsets.
    pub fn new(zero_pitch: f32, zero_roll: f32) -> Self {
        Self {
            zero_pitch,
            zero_roll,
            ..Self::default()
        }
    }

    /// Records a raw reading and returns it relative to the zero point.
    pub fn apply(&mut self, pitch: f32, roll: f32) -> (f32, f32) {
        self.last_pitch = pitch;
        self.last_roll = roll;
        (pitch - self.zero_pitch, roll - self.zero_roll)
    }

    /// Makes the last raw reading the new zero point.
    pub fn zero(&mut self) {
        self.zero_pitch = self.last_pitch;
        self.zero_roll = self.last_roll;
    }

    pub fn offsets(&self) -> (f32, f32) {
        (self.zero_pitch, self.zero_roll)
    }
}

/// One axis as shown on a level bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    pub angle: f32,
    pub tolerance: f32,
}

impl LevelReading {
    pub fn new(angle: f32, tolerance: f32) -> Self {
        Self { angle, tolerance }
    }

    /// Bar position from 0 to 100, level is 50.
    /// One degree moves the bar by one step.
    pub fn progress(&self) -> u8 {
        if self.angle.is_nan() {
            return 50;
        }

        (50.0 + self.angle).round().clamp(0.0, 100.0) as u8
    }

    pub fn is_level(&self) -> bool {
        self.angle.abs() < self.tolerance
    }
}

/// Settings for [`ToneFeedback`].
#[derive(Debug, Clone, Copy)]
pub struct FeedbackConfig {
    /// Degrees either side of zero that count as level.
    pub tolerance: f32,
    /// Length of each feedback tone.
    pub tone_ms: u32,
    /// Tilt that maps to the highest pitch and the longest pause.
    pub max_tilt: f32,
    /// Pause after a tone at `max_tilt`.
    pub max_gap_ms: u32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            tolerance: 2.0,
            tone_ms: 120,
            max_tilt: 45.0,
            max_gap_ms: 600,
        }
    }
}

/// Audible level feedback.
///
/// When both axes are within tolerance a short C-E-G chord plays.
/// Otherwise a tone plays whose pitch rises with the larger of the two tilts,
/// from A4 at level up to two octaves higher at `max_tilt`, followed by a pause
/// that gets shorter as the device gets closer to level.
/// Readings that arrive while the player is busy are dropped, so feedback never piles up.
pub struct ToneFeedback {
    queue: QueueHandle,
    config: FeedbackConfig,
    skipped: usize,
}

impl ToneFeedback {
    pub fn new(queue: QueueHandle, config: FeedbackConfig) -> Self {
        Self {
            queue,
            config,
            skipped: 0,
        }
    }

    /// Readings dropped because the player was still busy.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Items to queue for a reading.
    pub fn feedback_for(&self, pitch: f32, roll: f32) -> Result<Vec<PlayableItem>> {
        let cfg = &self.config;
        let level = |x: f32| LevelReading::new(x, cfg.tolerance).is_level();

        if level(pitch) && level(roll) {
            let chord = PlayableItem::composite([
                note::c(cfg.tone_ms),
                note::e(cfg.tone_ms),
                note::g(cfg.tone_ms * 2),
            ])?;
            return Ok(vec![chord]);
        }

        // `max` skips NaN, a reading with no usable axis plays as fully tilted
        let tilt = pitch.abs().max(roll.abs()).min(cfg.max_tilt);
        let ratio = if cfg.max_tilt > 0.0 && tilt.is_finite() {
            (tilt / cfg.max_tilt).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let tone = Tone::new(note::A4 * 2_f32.powf(2.0 * ratio), cfg.tone_ms)?;
        let gap = (cfg.max_gap_ms as f32 * ratio) as u32;

        let mut out = vec![PlayableItem::tone(tone)];
        if gap > 0 {
            out.push(PlayableItem::silence(gap));
        }

        Ok(out)
    }
}

impl LevelListener for ToneFeedback {
    fn on_level_changed(&mut self, pitch: f32, roll: f32) {
        if !self.queue.is_idle() {
            self.skipped += 1;
            trace!("Player busy, skipping feedback");
            return;
        }

        match self.feedback_for(pitch, roll) {
            Ok(items) => items.into_iter().for_each(|x| self.queue.queue(x)),
            Err(e) => trace!("No feedback for ({pitch}, {roll}): {e}"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::{
        CompositeLevelListener, FeedbackConfig, LevelListener, LevelReading, ToneFeedback,
        ZeroOffset,
    };
    use crate::{
        audio::{
            sequence::PlayableItem,
            session::mock::{Log, MockDevice},
            tone::note,
        },
        player::{BackgroundPlayer, PlayerConfig},
    };

    fn feedback() -> (BackgroundPlayer, ToneFeedback) {
        let player = BackgroundPlayer::new(
            Box::new(MockDevice::new(Log::default())),
            PlayerConfig::default().sample_rate(8000),
        )
        .unwrap();
        let feedback = ToneFeedback::new(player.handle(), FeedbackConfig::default());
        (player, feedback)
    }

    #[test]
    fn test_level_reading() {
        assert_eq!(LevelReading::new(0.0, 2.0).progress(), 50);
        assert_eq!(LevelReading::new(-7.4, 2.0).progress(), 43);
        assert_eq!(LevelReading::new(80.0, 2.0).progress(), 100);
        assert_eq!(LevelReading::new(-80.0, 2.0).progress(), 0);
        assert_eq!(LevelReading::new(f32::NAN, 2.0).progress(), 50);

        assert!(LevelReading::new(1.9, 2.0).is_level());
        assert!(LevelReading::new(-1.9, 2.0).is_level());
        assert!(!LevelReading::new(2.0, 2.0).is_level());
    }

    #[test]
    fn test_zero_offset() {
        let mut zero = ZeroOffset::default();
        assert_eq!(zero.apply(3.0, -4.0), (3.0, -4.0));

        zero.zero();
        assert_eq!(zero.offsets(), (3.0, -4.0));
        assert_eq!(zero.apply(3.0, -4.0), (0.0, 0.0));
        assert_eq!(zero.apply(5.0, 0.0), (2.0, 4.0));

        let restored = ZeroOffset::new(1.0, 1.0).apply(1.0, 2.0);
        assert_eq!(restored, (0.0, 1.0));
    }

    #[test]
    fn test_composite_listener_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());

        let mut listener = CompositeLevelListener::new()
            .with(move |p: f32, _r: f32| a.lock().unwrap().push(("a", p)))
            .with(move |p: f32, _r: f32| b.lock().unwrap().push(("b", p)));
        listener.on_level_changed(1.0, 0.0);
        listener.on_level_changed(2.0, 0.0);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a", 1.0), ("b", 1.0), ("a", 2.0), ("b", 2.0)]
        );
    }

    #[test]
    fn test_level_chord() {
        let (_player, feedback) = feedback();
        let items = feedback.feedback_for(0.5, -1.0).unwrap();
        assert_eq!(
            items,
            vec![PlayableItem::Composite(vec![
                note::c(120),
                note::e(120),
                note::g(240)
            ])]
        );
    }

    #[test]
    fn test_tilt_pitch_rises() {
        let (_player, feedback) = feedback();
        let freq = |tilt: f32| feedback.feedback_for(tilt, 0.0).unwrap()[0].tones()[0].frequency();

        assert!(freq(5.0) < freq(20.0));
        assert!(freq(20.0) < freq(-40.0));
        assert_eq!(freq(45.0), note::A4 * 4.0);
        assert_eq!(freq(90.0), note::A4 * 4.0);

        // Pause gets shorter closer to level
        let far = feedback.feedback_for(0.0, 30.0).unwrap();
        let near = feedback.feedback_for(0.0, 3.0).unwrap();
        assert_eq!(far.len(), 2);
        assert!(near[1].duration_ms() < far[1].duration_ms());

        // Unusable readings still produce a valid tone
        assert!(feedback.feedback_for(f32::NAN, f32::NAN).is_ok());
    }

    #[test]
    fn test_skips_while_busy() {
        let (player, mut feedback) = feedback();

        // No worker running, so the first feedback stays queued and the player is busy
        feedback.on_level_changed(10.0, 0.0);
        assert_eq!(player.pending(), 2);

        feedback.on_level_changed(0.0, 0.0);
        feedback.on_level_changed(30.0, 0.0);
        assert_eq!(player.pending(), 2);
        assert_eq!(feedback.skipped(), 2);
    }
}
