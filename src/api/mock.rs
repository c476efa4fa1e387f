use super::backend::DetectionBackend;
use super::error::ApiError;
use super::types::{
    DetectionParams, DetectionResult, PerformanceConfig, PerformanceSnapshot, PerformanceUpdate,
    RemoteStatus, StatusResponse, TaskId, TaskSummary, UploadResponse,
};
use crate::task::VideoFile;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted backend: every call pops the next queued reply for its endpoint.
pub struct MockBackend {
    uploads: Mutex<VecDeque<Result<UploadResponse, ApiError>>>,
    detections: Mutex<VecDeque<Result<(), ApiError>>>,
    statuses: Mutex<VecDeque<MockStatus>>,
    tasks: Mutex<Vec<TaskSummary>>,
    performance: Mutex<PerformanceConfig>,
    calls: Mutex<Vec<MockCall>>,
}

/// One scripted reply to a status request
#[derive(Debug, Clone)]
pub struct MockStatus {
    pub reply: Result<StatusResponse, ApiError>,
    pub delay: Duration,
}

impl MockStatus {
    pub fn pending() -> Self {
        Self::status(RemoteStatus::Pending, 0.0, None, None)
    }

    pub fn processing(progress: f64) -> Self {
        Self::status(
            RemoteStatus::Processing,
            progress,
            Some(format!("Processing {}%", progress)),
            None,
        )
    }

    pub fn completed(result: serde_json::Value) -> Self {
        Self::status(
            RemoteStatus::Completed,
            100.0,
            Some("Detection complete".to_string()),
            Some(DetectionResult::new(result)),
        )
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::status(RemoteStatus::Error, 0.0, Some(message.into()), None)
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            reply: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Holds the reply back for `delay` before returning it
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn status(
        status: RemoteStatus,
        progress: f64,
        message: Option<String>,
        result: Option<DetectionResult>,
    ) -> Self {
        Self {
            reply: Ok(StatusResponse {
                task_id: None,
                status,
                progress,
                message,
                result,
            }),
            delay: Duration::ZERO,
        }
    }
}

/// Record of a call made against the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Upload { file_name: String },
    StartDetection { id: TaskId, params: DetectionParams },
    Status { id: TaskId },
    ListTasks,
    Performance,
    UpdatePerformance(PerformanceUpdate),
    Download { id: TaskId },
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(VecDeque::new()),
            detections: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            tasks: Mutex::new(Vec::new()),
            performance: Mutex::new(PerformanceConfig {
                use_gpu: true,
                skip_frames: 3,
                detection_conf: 0.5,
                iou_threshold: 0.4,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn upload_ok(id: &str, filename: &str) -> Result<UploadResponse, ApiError> {
        Ok(UploadResponse {
            task_id: TaskId::new(id),
            filename: filename.to_string(),
            message: None,
        })
    }

    pub fn rejected(status: u16, message: Option<&str>) -> ApiError {
        ApiError::Rejected {
            status,
            message: message.map(str::to_string),
        }
    }

    pub fn add_upload(&self, reply: Result<UploadResponse, ApiError>) {
        self.uploads.lock().unwrap().push_back(reply);
    }

    pub fn add_detection(&self, reply: Result<(), ApiError>) {
        self.detections.lock().unwrap().push_back(reply);
    }

    pub fn add_status(&self, status: MockStatus) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn add_statuses(&self, statuses: impl IntoIterator<Item = MockStatus>) {
        let mut queue = self.statuses.lock().unwrap();
        for status in statuses {
            queue.push_back(status);
        }
    }

    pub fn set_tasks(&self, tasks: Vec<TaskSummary>) {
        *self.tasks.lock().unwrap() = tasks;
    }

    pub fn remaining_statuses(&self) -> usize {
        self.statuses.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Status { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn exhausted(endpoint: &str) -> ApiError {
        ApiError::Network {
            message: format!("MockBackend: no more {} responses in queue", endpoint),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetectionBackend for MockBackend {
    async fn upload(&self, file: &VideoFile) -> Result<UploadResponse, ApiError> {
        self.record(MockCall::Upload {
            file_name: file.name.clone(),
        });
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("upload")))
    }

    async fn start_detection(&self, id: &TaskId, params: DetectionParams) -> Result<(), ApiError> {
        self.record(MockCall::StartDetection {
            id: id.clone(),
            params,
        });
        self.detections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("detect")))
    }

    async fn status(&self, id: &TaskId) -> Result<StatusResponse, ApiError> {
        self.record(MockCall::Status { id: id.clone() });
        let next = self.statuses.lock().unwrap().pop_front();

        match next {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.reply.map(|mut status| {
                    status.task_id = Some(id.clone());
                    status
                })
            }
            None => Err(Self::exhausted("status")),
        }
    }

    async fn list_tasks(&self) -> Result<Vec<TaskSummary>, ApiError> {
        self.record(MockCall::ListTasks);
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn performance(&self) -> Result<PerformanceSnapshot, ApiError> {
        self.record(MockCall::Performance);
        Ok(PerformanceSnapshot {
            config: self.performance.lock().unwrap().clone(),
            info: None,
        })
    }

    async fn update_performance(
        &self,
        update: &PerformanceUpdate,
    ) -> Result<PerformanceSnapshot, ApiError> {
        self.record(MockCall::UpdatePerformance(update.clone()));
        let mut config = self.performance.lock().unwrap();
        if let Some(use_gpu) = update.use_gpu {
            config.use_gpu = use_gpu;
        }
        if let Some(skip_frames) = update.skip_frames {
            config.skip_frames = skip_frames.max(1);
        }
        if let Some(conf) = update.detection_conf {
            config.detection_conf = conf.clamp(0.1, 1.0);
        }
        if let Some(iou) = update.iou_threshold {
            config.iou_threshold = iou.clamp(0.1, 1.0);
        }
        Ok(PerformanceSnapshot {
            config: config.clone(),
            info: None,
        })
    }

    async fn download_result(&self, id: &TaskId, dest: &Path) -> Result<u64, ApiError> {
        self.record(MockCall::Download { id: id.clone() });
        let contents = format!("mock video for {}", id);
        tokio::fs::write(dest, contents.as_bytes())
            .await
            .map_err(|e| ApiError::LocalFile {
                path: dest.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(contents.len() as u64)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("remaining_statuses", &self.remaining_statuses())
            .field("calls", &self.calls.lock().unwrap().len())
            .finish()
    }
}
