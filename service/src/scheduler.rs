use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Per-game timeout timers.
///
/// Each armed timer is a tokio task that sleeps for the requested duration
/// and then puts the game id on the fire channel. The task holds nothing but
/// the id: the game may be mutated, finished, or reloaded from storage long
/// before the timer expires, and the receiver resolves the id at fire time.
/// Delivery is at-least-once; the state machine's terminal guard absorbs
/// duplicates, so no cancel operation is needed when a game finishes early.
pub struct TimeoutScheduler {
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    fire_tx: mpsc::Sender<String>,
}

impl TimeoutScheduler {
    /// Creates the scheduler and the receiving end of its fire channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (fire_tx, fire_rx) = mpsc::channel(capacity);
        let scheduler = Self {
            timers: Mutex::new(HashMap::new()),
            fire_tx,
        };
        (scheduler, fire_rx)
    }

    /// Arms the timer for a game, replacing any previous one so that re-arming
    /// after a restart cannot double the pending timers for one id.
    pub fn schedule(&self, game_id: &str, after: Duration) {
        let mut timers = self.timers.lock();
        if let Some(previous) = timers.remove(game_id) {
            previous.abort();
        }

        let fire_tx = self.fire_tx.clone();
        let id = game_id.to_string();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            log::trace!("timeout timer fired for game {task_id}");
            if fire_tx.send(task_id).await.is_err() {
                // receiver side already shut down, nothing left to notify
            }
        });

        timers.insert(id, handle);
        log::debug!("timeout timer armed for game {game_id} in {after:?}");
    }

    /// Number of timers that have not fired yet.
    pub fn active_count(&self) -> usize {
        let mut timers = self.timers.lock();
        timers.retain(|_, handle| !handle.is_finished());
        timers.len()
    }
}

impl Drop for TimeoutScheduler {
    fn drop(&mut self) {
        for (id, handle) in self.timers.lock().drain() {
            handle.abort();
            log::trace!("timeout timer dropped for game {id}");
        }
    }
}
