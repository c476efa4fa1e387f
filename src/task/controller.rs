//! Task lifecycle controller
//!
//! [`TaskController`] owns one detection job from file selection to result.
//! Operations that talk to the service take `&mut self`, so a host cannot start
//! a second upload or detection while one is in flight. Polling runs in the
//! background and writes into the shared task record; [`TaskController::snapshot`]
//! reads it back for presentation.
//!
//! # Example
//!
//! ```no_run
//! use fallwatch::api::{DetectionParams, HttpBackend};
//! use fallwatch::task::{TaskController, VideoFile};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(HttpBackend::new("http://localhost:5000")?);
//! let mut controller = TaskController::new(backend);
//!
//! controller.select(VideoFile::from_path("clip.mp4")?)?;
//! controller.upload().await?;
//! controller.start_detection(DetectionParams::default()).await?;
//!
//! let task = controller.wait().await?;
//! if let Some(quick) = task.result().and_then(|r| r.quick_results()) {
//!     println!("{} falls, risk {}", quick.total_falls, quick.risk_level);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use super::error::{TaskError, DETECTION_FAILED};
use super::model::{Phase, Task, TaskStatus, VideoFile};
use super::poll::{lock, PollHandle, PollLoop};
use super::preview::{NoPreview, PreviewHandle, PreviewProvider};
use crate::api::{DetectionBackend, DetectionParams, TaskId};
use crate::config::ClientConfig;
use crate::progress::{NoOpObserver, TaskEvent, TaskObserver};

/// Default delay between status requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const DETECTION_STARTED_MESSAGE: &str = "Detection started";

pub struct TaskController {
    backend: Arc<dyn DetectionBackend>,
    task: Arc<Mutex<Task>>,
    poll: Option<PollHandle>,
    preview: Option<Box<dyn PreviewHandle>>,
    previews: Arc<dyn PreviewProvider>,
    observer: Arc<dyn TaskObserver>,
    poll_interval: Duration,
}

impl TaskController {
    pub fn new(backend: Arc<dyn DetectionBackend>) -> Self {
        Self {
            backend,
            task: Arc::new(Mutex::new(Task::default())),
            poll: None,
            preview: None,
            previews: Arc::new(NoPreview),
            observer: Arc::new(NoOpObserver),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(backend: Arc<dyn DetectionBackend>, config: &ClientConfig) -> Self {
        Self::new(backend).with_poll_interval(config.poll_interval())
    }

    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_preview_provider(mut self, previews: Arc<dyn PreviewProvider>) -> Self {
        self.previews = previews;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Copy of the current task record
    pub fn snapshot(&self) -> Task {
        lock(&self.task).clone()
    }

    pub fn phase(&self) -> Phase {
        lock(&self.task).phase()
    }

    pub fn task_id(&self) -> Option<TaskId> {
        lock(&self.task).id().cloned()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn preview_location(&self) -> Option<String> {
        self.preview.as_ref().map(|p| p.location())
    }

    pub fn backend(&self) -> &Arc<dyn DetectionBackend> {
        &self.backend
    }

    /// Makes `file` the pending video.
    ///
    /// Validation failures leave the current task and preview untouched. On
    /// success any running poll loop is stopped and the previous preview is
    /// released before the new one is opened.
    pub fn select(&mut self, file: VideoFile) -> Result<(), TaskError> {
        file.validate()?;

        self.stop_polling();
        self.preview = None;
        self.preview = self.previews.open(&file);

        let (name, size) = (file.name.clone(), file.size);
        let mut task = lock(&self.task);
        task.select(file);
        self.observer.on_event(&TaskEvent::FileSelected { name, size });
        Ok(())
    }

    /// Sends the pending file to the service.
    ///
    /// On failure the task keeps whatever state it had before the call.
    pub async fn upload(&mut self) -> Result<TaskId, TaskError> {
        let file = lock(&self.task)
            .file()
            .cloned()
            .ok_or(TaskError::NoFileSelected)?;

        self.observer.on_event(&TaskEvent::UploadStarted {
            name: file.name.clone(),
        });

        let uploaded = self
            .backend
            .upload(&file)
            .await
            .map_err(TaskError::upload)?;

        self.stop_polling();
        lock(&self.task).mark_uploaded(uploaded.task_id.clone());

        info!(task_id = %uploaded.task_id, file = %uploaded.filename, "Upload accepted");
        self.observer.on_event(&TaskEvent::Uploaded {
            id: uploaded.task_id.clone(),
            filename: uploaded.filename,
        });
        Ok(uploaded.task_id)
    }

    /// Starts detection on the uploaded task and begins polling.
    ///
    /// `params` are forwarded as given. If the service refuses, the task stays
    /// `Uploaded` and no polling starts.
    pub async fn start_detection(&mut self, params: DetectionParams) -> Result<(), TaskError> {
        let id = {
            let task = lock(&self.task);
            match task.status() {
                TaskStatus::Uploaded { id } => id.clone(),
                _ => return Err(TaskError::NoActiveTask),
            }
        };

        self.backend
            .start_detection(&id, params)
            .await
            .map_err(TaskError::detect_start)?;

        let generation = lock(&self.task)
            .begin_detection(DETECTION_STARTED_MESSAGE)
            .ok_or(TaskError::NoActiveTask)?;

        self.observer.on_event(&TaskEvent::DetectionStarted {
            id: id.clone(),
            params,
        });

        debug!(task_id = %id, interval_ms = self.poll_interval.as_millis() as u64, "Starting poll loop");
        self.poll = Some(
            PollLoop {
                backend: self.backend.clone(),
                task: self.task.clone(),
                observer: self.observer.clone(),
                id,
                generation,
                interval: self.poll_interval,
            }
            .spawn(),
        );
        Ok(())
    }

    /// Waits for the running detection to reach a terminal state.
    ///
    /// Returns the completed task, or `BackendReportedError` when the service
    /// reported the detection as failed. Without an active or finished
    /// detection this fails with `NoActiveTask`.
    pub async fn wait(&mut self) -> Result<Task, TaskError> {
        if let Some(poll) = self.poll.as_mut() {
            poll.finished().await;
        }

        let task = self.snapshot();
        match task.status() {
            TaskStatus::Completed { .. } => Ok(task),
            TaskStatus::Failed { message, .. } => {
                Err(TaskError::BackendReportedError(message.clone()))
            }
            TaskStatus::Detecting { .. } => Err(TaskError::BackendReportedError(
                DETECTION_FAILED.to_string(),
            )),
            _ => Err(TaskError::NoActiveTask),
        }
    }

    /// Returns to the initial state from any point in the lifecycle.
    ///
    /// Stops polling first, so no transition or poll event follows it.
    pub fn reset(&mut self) {
        self.stop_polling();
        self.preview = None;

        // Same lock the poll loop emits under, so no stale event follows Reset
        let mut task = lock(&self.task);
        task.clear();
        self.observer.on_event(&TaskEvent::Reset);
    }

    fn stop_polling(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

impl fmt::Debug for TaskController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskController")
            .field("backend", &self.backend.name())
            .field("phase", &self.phase())
            .field("polling", &self.is_polling())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
