//! Errors surfaced by the task lifecycle

use thiserror::Error;

use crate::api::ApiError;

const UPLOAD_FAILED: &str = "Upload failed";
const DETECT_START_FAILED: &str = "Failed to start detection";
pub(crate) const DETECTION_FAILED: &str = "Detection failed";

/// Errors returned by [`TaskController`](super::TaskController) operations.
///
/// The first four are local checks that block an action before any request is
/// made. Remote variants carry the service's message verbatim when it sent one.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskError {
    #[error("Unsupported video format '{mime_type}'. Supported formats: MP4, AVI, MOV")]
    InvalidFormat { mime_type: String },

    #[error("File is {size} bytes, which exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("No video file selected")]
    NoFileSelected,

    #[error("No uploaded task is waiting for detection")]
    NoActiveTask,

    #[error("{0}")]
    UploadFailed(String),

    #[error("{0}")]
    DetectStartFailed(String),

    /// The service reported `status = error` while polling
    #[error("{0}")]
    BackendReportedError(String),

    #[error(transparent)]
    Transport(ApiError),
}

impl TaskError {
    pub(crate) fn upload(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message, .. } => {
                TaskError::UploadFailed(message.unwrap_or_else(|| UPLOAD_FAILED.to_string()))
            }
            other => TaskError::Transport(other),
        }
    }

    pub(crate) fn detect_start(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message, .. } => TaskError::DetectStartFailed(
                message.unwrap_or_else(|| DETECT_START_FAILED.to_string()),
            ),
            other => TaskError::Transport(other),
        }
    }

    /// Local validation errors are raised before touching the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            TaskError::InvalidFormat { .. }
                | TaskError::FileTooLarge { .. }
                | TaskError::NoFileSelected
                | TaskError::NoActiveTask
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_rejection_uses_service_message() {
        let err = TaskError::upload(ApiError::Rejected {
            status: 400,
            message: Some("unsupported video".to_string()),
        });
        assert_eq!(err, TaskError::UploadFailed("unsupported video".to_string()));
        assert_eq!(err.to_string(), "unsupported video");
    }

    #[test]
    fn test_upload_rejection_without_message_uses_fallback() {
        let err = TaskError::upload(ApiError::Rejected {
            status: 500,
            message: None,
        });
        assert_eq!(err, TaskError::UploadFailed(UPLOAD_FAILED.to_string()));
    }

    #[test]
    fn test_detect_start_transport_error() {
        let err = TaskError::detect_start(ApiError::Timeout { seconds: 30 });
        assert!(matches!(err, TaskError::Transport(ApiError::Timeout { .. })));
        assert!(!err.is_local());

        let rejected = TaskError::detect_start(ApiError::Rejected {
            status: 404,
            message: None,
        });
        assert_eq!(rejected.to_string(), DETECT_START_FAILED);
    }

    #[test]
    fn test_local_errors() {
        assert!(TaskError::NoFileSelected.is_local());
        assert!(TaskError::NoActiveTask.is_local());
        assert!(TaskError::FileTooLarge { size: 2, limit: 1 }.is_local());
        assert!(!TaskError::UploadFailed("x".to_string()).is_local());
    }
}
