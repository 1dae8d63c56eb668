//! Background tone player.
//!
//! One worker thread per player pulls items off a [`PlaybackQueue`] in order,
//! synthesizes them and plays each to completion before taking the next.
//! Producers only ever touch the queue through a [`QueueHandle`], so queueing never blocks on audio.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        sequence::PlayableItem,
        session::{BoxedDevice, PlaybackSession, StreamFormat},
        synth::synthesize,
    },
    constants::SAMPLE_RATE,
    error::{Error, Result},
};

pub mod queue;

use queue::{Claim, PlaybackQueue};

/// Worker settings.
#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    /// Rate buffers are synthesized and played at.
    pub sample_rate: u32,
    /// Time between playback position checks.
    pub poll_interval: Duration,
    /// How long past its expected length a session may run before it is abandoned.
    pub stall_grace: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            poll_interval: Duration::from_millis(1),
            stall_grace: Duration::from_secs(1),
        }
    }
}

impl PlayerConfig {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn stall_grace(mut self, stall_grace: Duration) -> Self {
        self.stall_grace = stall_grace;
        self
    }
}

/// Producer side of a player's queue.
/// Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct QueueHandle {
    queue: Arc<PlaybackQueue>,
}

impl QueueHandle {
    /// Appends an item to the end of the queue and returns right away.
    pub fn queue(&self, item: impl Into<PlayableItem>) {
        self.queue.push(item.into());
    }

    /// Nothing waiting and nothing sounding.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

pub struct BackgroundPlayer {
    queue: Arc<PlaybackQueue>,
    device: Arc<Mutex<BoxedDevice>>,
    config: PlayerConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundPlayer {
    pub fn new(device: BoxedDevice, config: PlayerConfig) -> Result<Self> {
        if config.sample_rate == 0 {
            return Err(Error::InvalidSampleRate);
        }

        Ok(Self {
            queue: Arc::new(PlaybackQueue::new()),
            device: Arc::new(Mutex::new(device)),
            config,
            worker: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            queue: self.queue.clone(),
        }
    }

    /// Appends an item to the end of the queue and returns right away.
    /// Items queued while no worker runs are kept until one is started.
    pub fn queue(&self, item: impl Into<PlayableItem>) {
        self.queue.push(item.into());
    }

    /// True if nothing is queued and no item is playing.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Starts the worker.
    /// Fails with [`Error::AlreadyRunning`] if a worker is already consuming this queue.
    /// If `stop` was called but the worker has not exited yet, the worker is kept instead.
    pub fn start(&self) -> Result<()> {
        match self.queue.claim() {
            Claim::Busy => return Err(Error::AlreadyRunning),
            Claim::Resumed => {
                debug!("Background player resumed before exiting");
                return Ok(());
            }
            Claim::Spawn => {}
        }

        let queue = self.queue.clone();
        let device = self.device.clone();
        let config = self.config;

        let handle = thread::Builder::new()
            .name("tone-player".to_owned())
            .spawn(move || run(&queue, &device, &config));

        match handle {
            Ok(handle) => {
                // Any previous worker has detached from the queue, reap it
                if let Some(old) = self.worker.lock().replace(handle) {
                    reap(old);
                }
                Ok(())
            }
            Err(e) => {
                self.queue.unclaim();
                Err(Error::Spawn(e))
            }
        }
    }

    /// Asks the worker to exit.
    /// The item playing now finishes; queued items stay queued.
    pub fn stop(&self) {
        self.queue.stop();
    }

    /// Waits for the worker thread to exit. Call after [`BackgroundPlayer::stop`].
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            reap(handle);
        }
    }

    /// Polls until the player is idle.
    /// Returns false if `timeout` passed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while !self.is_idle() {
            if start.elapsed() > timeout {
                return false;
            }
            thread::sleep(self.config.poll_interval.max(Duration::from_millis(1)));
        }

        true
    }
}

impl Drop for BackgroundPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reap(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("Background player panicked");
    }
}

fn run(queue: &PlaybackQueue, device: &Mutex<BoxedDevice>, config: &PlayerConfig) {
    info!("Background player started");

    while let Some(item) = queue.next() {
        debug!(ms = item.duration_ms(), "Received playable");
        // A panicking device costs one item, the loop and the queue flags stay intact
        match panic::catch_unwind(AssertUnwindSafe(|| play(&item, device, config))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Dropping playable: {e}"),
            Err(e) => error!("Playable panicked: {}", panic_message(&*e)),
        }
        queue.finish();
    }

    info!("Background player stopped");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(x) = payload.downcast_ref::<&str>() {
        x
    } else if let Some(x) = payload.downcast_ref::<String>() {
        x
    } else {
        "unknown panic"
    }
}

/// Plays one item to completion on the calling thread.
fn play(item: &PlayableItem, device: &Mutex<BoxedDevice>, config: &PlayerConfig) -> Result<()> {
    if let PlayableItem::Silence { duration_ms } = item {
        debug!("Silence for {duration_ms}ms");
        thread::sleep(item.duration());
        return Ok(());
    }

    let buffer = synthesize(item.tones(), config.sample_rate)?;
    if buffer.is_empty() {
        return Ok(());
    }

    let mut device = device.lock();
    let format = StreamFormat::new(config.sample_rate);
    let session = PlaybackSession::open(&mut **device, format, &buffer)?;
    if !session.wait(config.poll_interval, config.stall_grace) {
        warn!(
            device = %device.name(),
            elapsed = ?session.elapsed(),
            expected = ?session.expected_duration(),
            "Playback stalled, releasing"
        );
    }
    session.release();

    Ok(())
}
