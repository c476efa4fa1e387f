//! Progress reporting for task lifecycle events

mod handler;
mod logging;

pub use handler::{NoOpObserver, TaskEvent, TaskObserver};
pub use logging::LoggingObserver;
