//! Orientation sources.
//!
//! No sensor is wired up here, [`SimulatedOrientation`] stands in for one:
//! a random walk around level delivered over a channel at a fixed rate.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use super::LevelListener;
use crate::error::{Error, Result};

/// Furthest the simulated device will tilt on either axis.
const MAX_ANGLE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Degrees
    pub pitch: f32,
    /// Degrees
    pub roll: f32,
}

pub struct SimulatedOrientation {
    rx: Receiver<Orientation>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedOrientation {
    /// Starts producing a reading every `interval`.
    /// The same seed always gives the same readings.
    pub fn spawn(interval: Duration, seed: Option<u64>) -> Result<Self> {
        let (tx, rx) = channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("orientation".to_owned())
                .spawn(move || {
                    let mut walk = RandomWalk::new(&mut rng);
                    while running.load(Ordering::Relaxed) {
                        if tx.send(walk.step(&mut rng)).is_err() {
                            break;
                        }
                        thread::sleep(interval);
                    }
                    debug!("Orientation source stopped");
                })
                .map_err(Error::Spawn)?
        };

        Ok(Self {
            rx,
            running,
            handle: Some(handle),
        })
    }

    pub fn receiver(&self) -> &Receiver<Orientation> {
        &self.rx
    }

    /// Delivers readings to `listener` until `duration` has passed.
    /// Returns the number of readings delivered.
    pub fn drive(&self, listener: &mut dyn LevelListener, duration: Duration) -> usize {
        let end = Instant::now() + duration;
        let mut count = 0;

        loop {
            let left = end.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(x) => {
                    listener.on_level_changed(x.pitch, x.roll);
                    count += 1;
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }

        count
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimulatedOrientation {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drifts around randomly, with a pull back towards level.
struct RandomWalk {
    pitch: f32,
    roll: f32,
}

impl RandomWalk {
    fn new(rng: &mut impl Rng) -> Self {
        Self {
            pitch: rng.gen_range(-20.0..20.0),
            roll: rng.gen_range(-20.0..20.0),
        }
    }

    fn step(&mut self, rng: &mut impl Rng) -> Orientation {
        let mut drift = |x: f32| {
            let next = x * 0.95 + rng.gen_range(-1.5f32..1.5);
            next.clamp(-MAX_ANGLE, MAX_ANGLE)
        };

        self.pitch = drift(self.pitch);
        self.roll = drift(self.roll);

        Orientation {
            pitch: self.pitch,
            roll: self.roll,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{SimulatedOrientation, MAX_ANGLE};

    #[test]
    fn test_simulated_readings() {
        let mut source = SimulatedOrientation::spawn(Duration::from_millis(1), Some(7)).unwrap();

        let mut readings = Vec::new();
        let count = source.drive(
            &mut |p: f32, r: f32| readings.push((p, r)),
            Duration::from_millis(100),
        );
        source.stop();

        assert_eq!(count, readings.len());
        assert!(count > 0);
        for (p, r) in readings {
            assert!(p.abs() <= MAX_ANGLE && r.abs() <= MAX_ANGLE);
        }
    }

    #[test]
    fn test_seeded_sources_match() {
        let a = SimulatedOrientation::spawn(Duration::from_millis(1), Some(42)).unwrap();
        let b = SimulatedOrientation::spawn(Duration::from_millis(1), Some(42)).unwrap();

        for _ in 0..10 {
            assert_eq!(
                a.receiver().recv().unwrap(),
                b.receiver().recv().unwrap()
            );
        }
    }
}
