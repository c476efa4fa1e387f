//! Detection service abstraction
//!
//! The task controller talks to the service only through [`DetectionBackend`],
//! so the HTTP client can be swapped for a scripted backend in tests.

use async_trait::async_trait;
use std::path::Path;

use super::error::ApiError;
use super::types::{
    DetectionParams, PerformanceSnapshot, PerformanceUpdate, StatusResponse, TaskId, TaskSummary,
    UploadResponse,
};
use crate::task::VideoFile;

#[async_trait]
pub trait DetectionBackend: Send + Sync {
    /// Uploads a video and returns the identifier the service assigned to it
    async fn upload(&self, file: &VideoFile) -> Result<UploadResponse, ApiError>;

    /// Asks the service to start processing an uploaded video
    async fn start_detection(&self, id: &TaskId, params: DetectionParams) -> Result<(), ApiError>;

    /// Fetches the current status of a task
    async fn status(&self, id: &TaskId) -> Result<StatusResponse, ApiError>;

    /// Lists tasks known to the service, newest first
    async fn list_tasks(&self) -> Result<Vec<TaskSummary>, ApiError>;

    async fn performance(&self) -> Result<PerformanceSnapshot, ApiError>;

    async fn update_performance(
        &self,
        update: &PerformanceUpdate,
    ) -> Result<PerformanceSnapshot, ApiError>;

    /// Saves the annotated output video of a completed task to `dest`.
    /// Returns the number of bytes written.
    async fn download_result(&self, id: &TaskId, dest: &Path) -> Result<u64, ApiError>;

    /// Human-readable name of this backend (for logging)
    fn name(&self) -> &str;

    /// Base address of the service, if there is one
    fn endpoint(&self) -> Option<String> {
        None
    }
}
