//! Errors raised by detection backend clients

use thiserror::Error;

/// Errors that can occur while talking to the detection service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The service answered with a non-success status.
    ///
    /// `message` carries the `error` field of the response body when the
    /// service provided one.
    #[error("{}", rejected_message(*status, message.as_deref()))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Connection or transport failure
    #[error("Network error: {message}")]
    Network { message: String },

    /// The response body could not be decoded
    #[error("Invalid response from detection service: {message}")]
    InvalidResponse { message: String },

    /// The local video could not be read or the download target written
    #[error("Local file error ({path}): {message}")]
    LocalFile { path: String, message: String },
}

fn rejected_message(status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("Service error ({}): {}", status, message),
        None => format!("Service error ({})", status),
    }
}

impl ApiError {
    /// Message supplied by the service, if this is a rejection that carried one
    pub fn service_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// True when the service itself answered (as opposed to transport failures)
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                seconds: timeout_secs,
            }
        } else if err.is_decode() {
            ApiError::InvalidResponse {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            ApiError::Network {
                message: format!("Connection failed: {}", err),
            }
        } else {
            ApiError::Network {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_with_message() {
        let err = ApiError::Rejected {
            status: 400,
            message: Some("unsupported format".to_string()),
        };
        assert_eq!(err.to_string(), "Service error (400): unsupported format");
        assert_eq!(err.service_message(), Some("unsupported format"));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_rejected_display_without_message() {
        let err = ApiError::Rejected {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "Service error (502)");
        assert_eq!(err.service_message(), None);
    }

    #[test]
    fn test_transport_errors_are_not_rejections() {
        let err = ApiError::Network {
            message: "refused".to_string(),
        };
        assert!(!err.is_rejection());
        assert!(err.service_message().is_none());
        assert!(ApiError::Timeout { seconds: 5 }
            .to_string()
            .contains("5 seconds"));
    }
}
