//! Logging-based task observer

use super::{TaskEvent, TaskObserver};
use tracing::{debug, info, warn};

/// Observer that logs task events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl TaskObserver for LoggingObserver {
    fn on_event(&self, event: &TaskEvent) {
        match event {
            TaskEvent::FileSelected { name, size } => {
                info!(file = %name, size, "Video selected");
            }
            TaskEvent::UploadStarted { name } => {
                debug!(file = %name, "Uploading video");
            }
            TaskEvent::Uploaded { id, filename } => {
                info!(task_id = %id, file = %filename, "Video uploaded");
            }
            TaskEvent::DetectionStarted { id, params } => {
                info!(
                    task_id = %id,
                    confidence = params.confidence,
                    iou_threshold = params.iou_threshold,
                    "Detection started"
                );
            }
            TaskEvent::Progress {
                id,
                progress,
                message,
            } => {
                debug!(task_id = %id, progress, message = %message, "Detection progress");
            }
            TaskEvent::PollSkipped { id, error } => {
                debug!(task_id = %id, error = %error, "Status check skipped");
            }
            TaskEvent::Completed { id, elapsed } => {
                info!(
                    task_id = %id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Detection complete"
                );
            }
            TaskEvent::Failed { id, message } => {
                warn!(task_id = %id, error = %message, "Detection failed");
            }
            TaskEvent::Reset => {
                debug!("Task reset");
            }
        }
    }
}
