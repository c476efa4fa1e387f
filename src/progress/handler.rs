//! Task observer trait and lifecycle events

use std::time::Duration;

use crate::api::{DetectionParams, TaskId};

/// Events emitted as a task moves through its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A valid video was selected and is ready to upload
    FileSelected { name: String, size: u64 },

    /// Upload request sent
    UploadStarted { name: String },

    /// Service accepted the upload
    Uploaded { id: TaskId, filename: String },

    /// Detection was accepted and polling began
    DetectionStarted { id: TaskId, params: DetectionParams },

    /// A poll tick reported progress
    Progress {
        id: TaskId,
        progress: u8,
        message: String,
    },

    /// A poll tick failed in transit; polling continues
    PollSkipped { id: TaskId, error: String },

    /// Detection finished successfully
    Completed { id: TaskId, elapsed: Duration },

    /// Service reported the detection as failed
    Failed { id: TaskId, message: String },

    /// Task state was cleared
    Reset,
}

/// Trait for presenting task events
pub trait TaskObserver: Send + Sync {
    /// Called for every lifecycle event.
    ///
    /// State-changing events are delivered while the task record is locked,
    /// so implementations should return quickly and must not call back into
    /// the controller.
    fn on_event(&self, event: &TaskEvent);
}

/// No-op observer that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl TaskObserver for NoOpObserver {
    fn on_event(&self, _event: &TaskEvent) {
        // Intentionally empty
    }
}
