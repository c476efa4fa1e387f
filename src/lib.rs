//! fallwatch - client for a fall-detection video service
//!
//! This library drives one video through the service's pipeline: select a
//! local file, upload it, start detection with chosen thresholds, then poll
//! until the analysis completes or fails. The CLI in `main.rs` is one host; any
//! UI can embed [`TaskController`] the same way.
//!
//! # Core Concepts
//!
//! - **Backend**: [`DetectionBackend`] abstracts the service. [`HttpBackend`]
//!   speaks its HTTP API; [`api::MockBackend`] scripts responses for tests.
//! - **Task**: the single active job, whose [`TaskStatus`] moves
//!   `Idle → Uploaded → Detecting → Completed | Failed`.
//! - **Observers**: [`TaskObserver`] implementations receive lifecycle events
//!   for presentation (logs, progress bars).
//!
//! # Example Usage
//!
//! ```no_run
//! use fallwatch::{ClientConfig, DetectionParams, HttpBackend, TaskController, VideoFile};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let backend = Arc::new(HttpBackend::from_config(&config)?);
//! let mut controller = TaskController::from_config(backend, &config);
//!
//! controller.select(VideoFile::from_path("fall.mp4")?)?;
//! controller.upload().await?;
//! controller.start_detection(DetectionParams::default()).await?;
//! let task = controller.wait().await?;
//! println!("{:?}", task.result());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod progress;
pub mod task;
pub mod util;

pub use api::{
    ApiError, DetectionBackend, DetectionParams, DetectionResult, HttpBackend, QuickResults,
    RiskLevel, TaskId,
};
pub use config::{ClientConfig, ConfigError};
pub use progress::{LoggingObserver, NoOpObserver, TaskEvent, TaskObserver};
pub use task::{Phase, Task, TaskController, TaskError, TaskStatus, VideoFile};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
