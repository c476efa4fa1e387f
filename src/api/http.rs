//! HTTP client for the detection service
//!
//! Talks to the service's JSON endpoints with a shared `reqwest` client. Every
//! call maps transport failures, non-success statuses and undecodable bodies to
//! [`ApiError`] so callers can tell a rejection (which carries the service's own
//! message) apart from a network blip.
//!
//! # Example
//!
//! ```no_run
//! use fallwatch::api::{DetectionBackend, HttpBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpBackend::new("http://localhost:5000")?;
//! for task in backend.list_tasks().await? {
//!     println!("{} {} {}", task.id, task.filename, task.status);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use super::backend::DetectionBackend;
use super::error::ApiError;
use super::types::{
    DetectionParams, ErrorBody, PerformanceBody, PerformanceSnapshot, PerformanceUpdate,
    StatusResponse, TaskId, TaskListBody, TaskSummary, UploadResponse,
};
use crate::config::ClientConfig;
use crate::task::VideoFile;

/// Default timeout for JSON calls
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default timeout for upload and download transfers
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 600;

/// Multipart field the service reads the video from
const UPLOAD_FIELD: &str = "video";

/// Detection service client over HTTP
///
/// Cheap to share behind an `Arc`; the inner `reqwest::Client` pools connections.
pub struct HttpBackend {
    base_url: String,
    http_client: Client,
    request_timeout: Duration,
    transfer_timeout: Duration,
}

impl HttpBackend {
    /// Creates a client with default timeouts
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeouts(
            base_url,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_TRANSFER_TIMEOUT_SECS),
        )
    }

    /// Creates a client with explicit timeouts.
    ///
    /// `request_timeout` applies to status, detect, history and tuning calls;
    /// `transfer_timeout` applies to uploads and result downloads.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        request_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http_client = Client::builder().build().map_err(|e| ApiError::Network {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            base_url,
            http_client,
            request_timeout,
            transfer_timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_timeouts(
            config.server_url.clone(),
            config.request_timeout(),
            config.upload_timeout(),
        )
    }

    /// Page showing the detailed result of a task
    pub fn result_url(&self, id: &TaskId) -> String {
        self.url(&format!("/result/{}", id))
    }

    /// Location of the annotated output video of a task
    pub fn download_url(&self, id: &TaskId) -> String {
        self.url(&format!("/download/{}", id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<Response, ApiError> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            let err = ApiError::from_reqwest(e, timeout.as_secs());
            debug!("Request to {} failed: {}", self.base_url, err);
            err
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());

        debug!(status, body = %body, "Detection service rejected request");

        Err(ApiError::Rejected { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.text().await.map_err(|e| ApiError::Network {
            message: format!("Failed to read response body: {}", e),
        })?;

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse detection service response: {}", e);
            ApiError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
            }
        })
    }

    async fn stream_to_file(&self, mut response: Response, path: &Path) -> Result<u64, ApiError> {
        let mut out = tokio::fs::File::create(path)
            .await
            .map_err(|e| local_file_error(path, e))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.transfer_timeout.as_secs()))?
        {
            out.write_all(&chunk)
                .await
                .map_err(|e| local_file_error(path, e))?;
            written += chunk.len() as u64;
        }
        out.flush().await.map_err(|e| local_file_error(path, e))?;
        Ok(written)
    }

    fn performance_snapshot(body: PerformanceBody) -> Result<PerformanceSnapshot, ApiError> {
        match body.config {
            Some(config) if body.success => Ok(PerformanceSnapshot {
                config,
                info: body.info,
            }),
            _ => Err(ApiError::Rejected {
                status: 200,
                message: body.error,
            }),
        }
    }
}

#[async_trait]
impl DetectionBackend for HttpBackend {
    async fn upload(&self, file: &VideoFile) -> Result<UploadResponse, ApiError> {
        let path = file.path.display().to_string();
        let handle = tokio::fs::File::open(&file.path)
            .await
            .map_err(|e| ApiError::LocalFile {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let part = Part::stream_with_length(reqwest::Body::from(handle), file.size)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ApiError::LocalFile {
                path,
                message: format!("Invalid MIME type '{}': {}", file.mime_type, e),
            })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        info!(file = %file.name, size = file.size, "Uploading video");
        let start = Instant::now();

        let response = self
            .send(
                self.http_client.post(self.url("/upload")).multipart(form),
                self.transfer_timeout,
            )
            .await?;
        let uploaded: UploadResponse = Self::decode(response).await?;

        info!(
            task_id = %uploaded.task_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upload complete"
        );
        Ok(uploaded)
    }

    async fn start_detection(&self, id: &TaskId, params: DetectionParams) -> Result<(), ApiError> {
        debug!(
            task_id = %id,
            confidence = params.confidence,
            iou_threshold = params.iou_threshold,
            "Starting detection"
        );

        self.send(
            self.http_client
                .post(self.url(&format!("/detect/{}", id)))
                .json(&params),
            self.request_timeout,
        )
        .await?;
        Ok(())
    }

    async fn status(&self, id: &TaskId) -> Result<StatusResponse, ApiError> {
        let response = self
            .send(
                self.http_client.get(self.url(&format!("/status/{}", id))),
                self.request_timeout,
            )
            .await?;
        Self::decode(response).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskSummary>, ApiError> {
        let response = self
            .send(
                self.http_client.get(self.url("/api/tasks")),
                self.request_timeout,
            )
            .await?;
        let body: TaskListBody = Self::decode(response).await?;

        let mut tasks = body.into_tasks();
        // ISO-8601 timestamps order lexicographically
        tasks.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(tasks)
    }

    async fn performance(&self) -> Result<PerformanceSnapshot, ApiError> {
        let response = self
            .send(
                self.http_client.get(self.url("/api/performance")),
                self.request_timeout,
            )
            .await?;
        Self::performance_snapshot(Self::decode(response).await?)
    }

    async fn update_performance(
        &self,
        update: &PerformanceUpdate,
    ) -> Result<PerformanceSnapshot, ApiError> {
        if update.is_empty() {
            warn!("Sending empty performance update");
        }

        let response = self
            .send(
                self.http_client
                    .post(self.url("/api/performance"))
                    .json(update),
                self.request_timeout,
            )
            .await?;
        Self::performance_snapshot(Self::decode(response).await?)
    }

    async fn download_result(&self, id: &TaskId, dest: &Path) -> Result<u64, ApiError> {
        let response = self
            .send(
                self.http_client.get(self.download_url(id)),
                self.transfer_timeout,
            )
            .await?;

        // Stream into a sibling file and only move it into place once complete
        let partial = partial_path(dest);
        let written = match self.stream_to_file(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    debug!(path = %partial.display(), error = %cleanup, "No partial download to remove");
                }
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|e| local_file_error(dest, e))?;

        info!(task_id = %id, bytes = written, dest = %dest.display(), "Result video saved");
        Ok(written)
    }

    fn name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

/// `result.mp4` downloads through `result.mp4.part`
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn local_file_error(path: &Path, e: std::io::Error) -> ApiError {
    ApiError::LocalFile {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .finish()
    }
}
