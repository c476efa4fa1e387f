//! Detection service integration
//!
//! This module provides the [`DetectionBackend`] abstraction used by the task
//! controller, the HTTP implementation that talks to the real service, and a
//! scripted mock for tests.

pub mod backend;
pub mod error;
pub mod http;
pub mod mock;
pub mod types;

// Re-export commonly used types
pub use backend::DetectionBackend;
pub use error::ApiError;
pub use http::HttpBackend;
pub use mock::{MockBackend, MockCall, MockStatus};
pub use types::{
    clamp_progress, DetectionParams, DetectionResult, PerformanceConfig, PerformanceInfo,
    PerformanceSnapshot, PerformanceUpdate, QuickResults, RemoteStatus, RiskLevel,
    StatusResponse, TaskId, TaskSummary, UploadResponse,
};
