//! Fixed-interval status polling for a detecting task
//!
//! The loop runs as a spawned tokio task. It issues one status request per
//! tick and never overlaps requests; a slow response simply delays the next
//! tick. Transport failures skip the tick and polling carries on, so a dead
//! service keeps the loop alive until it is cancelled: there is no retry cap,
//! backoff or overall deadline.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::model::{Task, TickOutcome};
use crate::api::{DetectionBackend, TaskId};
use crate::progress::{TaskEvent, TaskObserver};

/// Handle to a running poll loop.
///
/// Cancelling (or dropping) the handle stops the loop before its next request.
#[derive(Debug)]
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        // Receiver is gone once the loop has exited on its own
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the loop to exit
    pub(crate) async fn finished(&mut self) {
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Poll loop ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub(crate) struct PollLoop {
    pub backend: Arc<dyn DetectionBackend>,
    pub task: Arc<Mutex<Task>>,
    pub observer: Arc<dyn TaskObserver>,
    pub id: TaskId,
    pub generation: u64,
    pub interval: Duration,
}

impl PollLoop {
    pub(crate) fn spawn(self) -> PollHandle {
        let (cancel, cancelled) = watch::channel(false);
        let join = tokio::spawn(self.run(cancelled));
        PollHandle {
            cancel,
            join: Some(join),
        }
    }

    async fn run(self, mut cancelled: watch::Receiver<bool>) {
        let started = Instant::now();
        // First request goes out one interval after detection starts
        let mut ticker = time::interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                _ = ticker.tick() => {}
            }
            tick += 1;

            let response = tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                response = self.backend.status(&self.id) => response,
            };

            let status = match response {
                Ok(status) => status,
                Err(e) => {
                    warn!(task_id = %self.id, tick, error = %e, "Status check failed, will retry");
                    self.observer.on_event(&TaskEvent::PollSkipped {
                        id: self.id.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            // Emit under the task lock so a concurrent reset or select cannot
            // land between the transition and its event
            let keep_polling = {
                let mut task = lock(&self.task);
                let outcome = task.apply_status(self.generation, status);
                debug!(task_id = %self.id, tick, ?outcome, "Applied status");
                let event = match outcome {
                    TickOutcome::Ignored => None,
                    TickOutcome::Progress { progress, message } => Some(TaskEvent::Progress {
                        id: self.id.clone(),
                        progress,
                        message,
                    }),
                    TickOutcome::Completed => Some(TaskEvent::Completed {
                        id: self.id.clone(),
                        elapsed: started.elapsed(),
                    }),
                    TickOutcome::Failed { message } => Some(TaskEvent::Failed {
                        id: self.id.clone(),
                        message,
                    }),
                };
                let keep_polling = matches!(event, Some(TaskEvent::Progress { .. }));
                if let Some(event) = event {
                    self.observer.on_event(&event);
                }
                keep_polling
            };

            if !keep_polling {
                break;
            }
        }

        debug!(task_id = %self.id, ticks = tick, "Poll loop stopped");
    }
}

/// Locks the shared task; a panic elsewhere must not wedge the controller
pub(crate) fn lock(task: &Mutex<Task>) -> MutexGuard<'_, Task> {
    task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
