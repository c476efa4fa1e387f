//! Detection task lifecycle
//!
//! A task moves `Idle → Uploaded → Detecting → Completed | Failed`. The
//! [`TaskController`] drives those transitions against a
//! [`DetectionBackend`](crate::api::DetectionBackend) and polls the service
//! while detection runs.

pub mod controller;
pub mod error;
pub mod model;
pub mod poll;
pub mod preview;

pub use controller::{TaskController, DEFAULT_POLL_INTERVAL};
pub use error::TaskError;
pub use model::{
    mime_for_extension, Phase, Task, TaskStatus, TickOutcome, VideoFile, ALLOWED_MIME_TYPES,
    MAX_UPLOAD_BYTES,
};
pub use poll::PollHandle;
pub use preview::{FilePreview, NoPreview, PreviewHandle, PreviewProvider};
