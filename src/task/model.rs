//! Client-side model of one detection job

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{TaskError, DETECTION_FAILED};
use crate::api::{clamp_progress, DetectionResult, RemoteStatus, StatusResponse, TaskId};

/// Largest video the service accepts (500 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// MIME types accepted for upload
pub const ALLOWED_MIME_TYPES: &[&str] = &["video/mp4", "video/avi", "video/mov", "video/quicktime"];

const DEFAULT_PROGRESS_MESSAGE: &str = "Processing...";

/// A local video selected for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub path: PathBuf,
}

impl VideoFile {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            path: path.into(),
        }
    }

    /// Describes a file on disk, inferring its MIME type from the extension
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(mime_for_extension)
            .unwrap_or("application/octet-stream");

        Ok(Self::new(name, metadata.len(), mime_type, path))
    }

    /// Checks format and size against what the service accepts
    pub fn validate(&self) -> Result<(), TaskError> {
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(TaskError::InvalidFormat {
                mime_type: self.mime_type.clone(),
            });
        }
        if self.size > MAX_UPLOAD_BYTES {
            return Err(TaskError::FileTooLarge {
                size: self.size,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }
}

/// MIME type browsers report for common video extensions
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/avi",
        "mov" | "qt" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Where a task is in its lifecycle.
///
/// The task id lives inside every post-upload variant, so a task has an id
/// exactly when it has been uploaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TaskStatus {
    Idle,
    Uploaded {
        id: TaskId,
    },
    Detecting {
        id: TaskId,
        progress: u8,
        message: String,
    },
    Completed {
        id: TaskId,
        result: Option<DetectionResult>,
    },
    Failed {
        id: TaskId,
        message: String,
    },
}

/// Fieldless view of [`TaskStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Uploaded,
    Detecting,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Uploaded => "uploaded",
            Phase::Detecting => "detecting",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a single status response did to the task
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Response was stale or arrived after the task left `Detecting`
    Ignored,
    Progress { progress: u8, message: String },
    Completed,
    Failed { message: String },
}

impl TickOutcome {
    pub fn ends_polling(&self) -> bool {
        !matches!(self, TickOutcome::Progress { .. })
    }
}

/// The single task tracked by a controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    file: Option<VideoFile>,
    status: TaskStatus,
    /// Bumped whenever in-flight poll responses must stop applying
    #[serde(skip)]
    generation: u64,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            file: None,
            status: TaskStatus::Idle,
            generation: 0,
        }
    }
}

impl Task {
    pub fn file(&self) -> Option<&VideoFile> {
        self.file.as_ref()
    }

    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        match self.status {
            TaskStatus::Idle => Phase::Idle,
            TaskStatus::Uploaded { .. } => Phase::Uploaded,
            TaskStatus::Detecting { .. } => Phase::Detecting,
            TaskStatus::Completed { .. } => Phase::Completed,
            TaskStatus::Failed { .. } => Phase::Failed,
        }
    }

    pub fn id(&self) -> Option<&TaskId> {
        match &self.status {
            TaskStatus::Idle => None,
            TaskStatus::Uploaded { id }
            | TaskStatus::Detecting { id, .. }
            | TaskStatus::Completed { id, .. }
            | TaskStatus::Failed { id, .. } => Some(id),
        }
    }

    /// Progress percentage; only meaningful while detecting
    pub fn progress(&self) -> Option<u8> {
        match &self.status {
            TaskStatus::Detecting { progress, .. } => Some(*progress),
            TaskStatus::Completed { .. } => Some(100),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Detecting { message, .. } | TaskStatus::Failed { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        match &self.status {
            TaskStatus::Completed { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces everything with a fresh idle task for `file`
    pub(crate) fn select(&mut self, file: VideoFile) {
        self.generation += 1;
        self.file = Some(file);
        self.status = TaskStatus::Idle;
    }

    pub(crate) fn clear(&mut self) {
        self.generation += 1;
        self.file = None;
        self.status = TaskStatus::Idle;
    }

    pub(crate) fn mark_uploaded(&mut self, id: TaskId) {
        self.generation += 1;
        self.status = TaskStatus::Uploaded { id };
    }

    /// Moves an uploaded task into `Detecting` and returns the generation the
    /// new poll loop must present with its updates
    pub(crate) fn begin_detection(&mut self, message: impl Into<String>) -> Option<u64> {
        let TaskStatus::Uploaded { id } = &self.status else {
            return None;
        };
        let id = id.clone();
        self.generation += 1;
        self.status = TaskStatus::Detecting {
            id,
            progress: 0,
            message: message.into(),
        };
        Some(self.generation)
    }

    /// Applies one status response from the poll loop of `generation`.
    ///
    /// Responses from a superseded loop, or arriving once the task has left
    /// `Detecting`, are discarded so the terminal transition happens once.
    pub(crate) fn apply_status(&mut self, generation: u64, response: StatusResponse) -> TickOutcome {
        if generation != self.generation {
            return TickOutcome::Ignored;
        }
        let TaskStatus::Detecting { id, .. } = &self.status else {
            return TickOutcome::Ignored;
        };
        let id = id.clone();

        match response.status {
            RemoteStatus::Completed => {
                self.status = TaskStatus::Completed {
                    id,
                    result: response.result,
                };
                TickOutcome::Completed
            }
            RemoteStatus::Error => {
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DETECTION_FAILED.to_string());
                self.status = TaskStatus::Failed {
                    id,
                    message: message.clone(),
                };
                TickOutcome::Failed { message }
            }
            RemoteStatus::Pending | RemoteStatus::Processing | RemoteStatus::Unknown => {
                let progress = clamp_progress(response.progress);
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_PROGRESS_MESSAGE.to_string());
                self.status = TaskStatus::Detecting {
                    id,
                    progress,
                    message: message.clone(),
                };
                TickOutcome::Progress { progress, message }
            }
        }
    }
}
