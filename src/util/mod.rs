//! Utility modules for fallwatch
//!
//! Currently this is structured logging setup shared by the CLI and any host
//! embedding the library.

pub mod logging;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
