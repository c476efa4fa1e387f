//! Wire types exchanged with the detection service

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque task identifier assigned by the service at upload time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body returned by `POST /upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub task_id: TaskId,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Detection thresholds forwarded to `POST /detect/{id}`.
///
/// Values are sent as given; the service is responsible for range checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub confidence: f64,
    pub iou_threshold: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            iou_threshold: 0.45,
        }
    }
}

/// Task status as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Pending,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::Error)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteStatus::Pending => "pending",
            RemoteStatus::Processing => "processing",
            RemoteStatus::Completed => "completed",
            RemoteStatus::Error => "error",
            RemoteStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Body returned by `GET /status/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub status: RemoteStatus,
    /// Raw progress as sent by the service; may fall outside 0..=100
    #[serde(default, deserialize_with = "progress_or_zero")]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DetectionResult>,
}

/// Missing and `null` progress both read as zero
fn progress_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Clamps a service-reported progress value into a whole percentage
pub fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).floor() as u8
}

/// Analysis payload attached to a completed task.
///
/// The structure is owned by the service; accessors pick out the fields the
/// client presents and leave the rest untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionResult(Value);

impl DetectionResult {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Server-side path of the annotated output video
    pub fn output_video_path(&self) -> Option<&str> {
        self.0.get("output_video_path").and_then(Value::as_str)
    }

    /// Headline numbers for display; `None` when the payload has no analysis
    pub fn quick_results(&self) -> Option<QuickResults> {
        let analysis = self.0.get("analysis")?;
        if analysis.is_null() {
            return None;
        }
        let summary = analysis.get("summary");

        let total_falls = summary
            .and_then(|s| s.get("total_falls"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let risk_level = summary
            .and_then(|s| s.get("risk_level"))
            .and_then(Value::as_str)
            .map(RiskLevel::parse)
            .unwrap_or(RiskLevel::Unknown);
        let average_confidence = analysis
            .get("confidence_analysis")
            .and_then(|c| c.get("average"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let processing_time_secs = self
            .0
            .get("summary")
            .and_then(|s| s.get("processing_time"))
            .and_then(Value::as_f64);

        Some(QuickResults {
            total_falls,
            risk_level,
            average_confidence,
            processing_time_secs,
        })
    }
}

/// Risk classification produced by the service's analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickResults {
    pub total_falls: u64,
    pub risk_level: RiskLevel,
    /// Mean detection confidence in 0.0..=1.0
    pub average_confidence: f64,
    pub processing_time_secs: Option<f64>,
}

impl QuickResults {
    pub fn confidence_percent(&self) -> u32 {
        (self.average_confidence * 100.0).round().max(0.0) as u32
    }
}

/// One row of `GET /api/tasks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub filename: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub progress: f64,
    pub upload_time: String,
}

impl TaskSummary {
    /// Upload time as sent by the service (ISO-8601 without offset)
    pub fn uploaded_at(&self) -> Option<NaiveDateTime> {
        self.upload_time.parse::<NaiveDateTime>().ok()
    }
}

/// `GET /api/tasks` has been served both wrapped and as a bare list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TaskListBody {
    Wrapped { tasks: Vec<TaskSummary> },
    Bare(Vec<TaskSummary>),
}

impl TaskListBody {
    pub(crate) fn into_tasks(self) -> Vec<TaskSummary> {
        match self {
            TaskListBody::Wrapped { tasks } => tasks,
            TaskListBody::Bare(tasks) => tasks,
        }
    }
}

/// Detection engine tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub use_gpu: bool,
    pub skip_frames: u32,
    pub detection_conf: f64,
    pub iou_threshold: f64,
}

/// Partial update for `POST /api/performance`; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_gpu: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_conf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iou_threshold: Option<f64>,
}

impl PerformanceUpdate {
    pub fn is_empty(&self) -> bool {
        self.use_gpu.is_none()
            && self.skip_frames.is_none()
            && self.detection_conf.is_none()
            && self.iou_threshold.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_frames_effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_status: Option<String>,
}

/// Body of both `GET` and `POST /api/performance`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PerformanceBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub config: Option<PerformanceConfig>,
    #[serde(default)]
    pub info: Option<PerformanceInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Current tuning plus the service's human-readable notes on it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub config: PerformanceConfig,
    pub info: Option<PerformanceInfo>,
}

/// Error body the service sends alongside non-success statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
