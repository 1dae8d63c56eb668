//! Ordered playback queue shared by producers and the single worker.
//!
//! The item list and the worker flags live behind one lock,
//! so `is_idle` never sees an item that is neither queued nor executing.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::audio::sequence::PlayableItem;

#[derive(Default)]
pub struct PlaybackQueue {
    state: Mutex<State>,
    ready: Condvar,
}

#[derive(Default)]
struct State {
    items: VecDeque<PlayableItem>,
    /// Cleared by `stop`, the worker exits the next time it looks for an item.
    running: bool,
    /// An item has been taken off the queue and is still playing.
    executing: bool,
    /// A worker loop is attached to this queue.
    consumer: bool,
}

/// Outcome of trying to attach a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// No worker was attached, the caller must spawn one.
    Spawn,
    /// A stopping worker had not exited yet and was told to keep going.
    Resumed,
    /// A worker is already running.
    Busy,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item. Never blocks on playback.
    pub fn push(&self, item: PlayableItem) {
        let mut state = self.state.lock();
        state.items.push_back(item);
        debug!(pending = state.items.len(), "Queued playable");
        drop(state);

        self.ready.notify_one();
    }

    /// Items waiting to be played, not counting the one executing.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nothing queued and nothing playing.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.items.is_empty() && !state.executing
    }

    pub fn is_executing(&self) -> bool {
        self.state.lock().executing
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub(crate) fn claim(&self) -> Claim {
        let mut state = self.state.lock();
        match (state.consumer, state.running) {
            (true, true) => Claim::Busy,
            (true, false) => {
                state.running = true;
                Claim::Resumed
            }
            (false, _) => {
                state.consumer = true;
                state.running = true;
                Claim::Spawn
            }
        }
    }

    /// Undoes a [`Claim::Spawn`] when the worker could not be started.
    pub(crate) fn unclaim(&self) {
        let mut state = self.state.lock();
        state.consumer = false;
        state.running = false;
    }

    pub(crate) fn stop(&self) {
        self.state.lock().running = false;
        self.ready.notify_all();
    }

    /// Blocks until there is an item to play or the queue is stopped.
    /// A returned item is marked as executing until [`PlaybackQueue::finish`] is called.
    /// On stop the worker is detached and the remaining items stay queued.
    pub(crate) fn next(&self) -> Option<PlayableItem> {
        let mut state = self.state.lock();
        loop {
            if !state.running {
                state.consumer = false;
                return None;
            }

            if let Some(item) = state.items.pop_front() {
                state.executing = true;
                return Some(item);
            }

            self.ready.wait(&mut state);
        }
    }

    pub(crate) fn finish(&self) {
        self.state.lock().executing = false;
    }
}
