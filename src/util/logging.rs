//! Structured logging setup for fallwatch
//!
//! Logs go to stderr so command output on stdout stays machine-readable. The
//! `fallwatch` target follows the configured level; the HTTP stack is held at
//! `warn` unless `RUST_LOG` says otherwise.
//!
//! # Example
//!
//! ```no_run
//! use fallwatch::util::logging;
//! use tracing::{debug, info};
//!
//! logging::init_from_env();
//!
//! info!("Watching detection service");
//! debug!(task_id = "abc123", progress = 40, "Status applied");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const QUIET_TARGETS: [&str; 4] = ["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn"];

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for the `fallwatch` target
    pub level: Level,

    /// Emit one JSON object per line instead of human-readable text
    pub use_json: bool,

    /// Include the module target (e.g. `fallwatch::task::poll`)
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Use ANSI colors; ignored for JSON output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
            ansi: atty::is(atty::Stream::Stderr),
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level derived from `-v`/`-q` style flags.
    ///
    /// `quiet` wins over `verbose`; one `-v` means debug, two or more trace.
    pub fn from_verbosity(base: Level, verbose: u8, quiet: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else {
            match verbose {
                0 => base,
                1 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };
        Self::with_level(level)
    }

    /// JSON lines with targets and source locations, for log collectors
    pub fn json() -> Self {
        Self {
            use_json: true,
            include_target: true,
            include_location: true,
            ansi: false,
            ..Default::default()
        }
    }
}

/// Parses a log level name, case-insensitively.
///
/// Unknown names fall back to `INFO` with a warning on stderr.
///
/// ```
/// use fallwatch::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("Debug"), Level::DEBUG);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level, respect_rust_log: bool) -> EnvFilter {
    let mut filter = if respect_rust_log {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("")
    };

    if let Ok(own) = format!("fallwatch={}", level).parse() {
        filter = filter.add_directive(own);
    }

    if !respect_rust_log {
        for target in QUIET_TARGETS {
            if let Ok(directive) = target.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    filter
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level, env::var("RUST_LOG").is_ok());

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(config.ansi)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Initializes logging from `FALLWATCH_LOG_LEVEL` and `FALLWATCH_LOG_JSON`.
pub fn init_from_env() {
    init_logging(config_from_env());
}

fn config_from_env() -> LoggingConfig {
    let level = env::var("FALLWATCH_LOG_LEVEL")
        .map(|v| parse_level(&v))
        .unwrap_or(Level::INFO);

    let use_json = env::var("FALLWATCH_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    if use_json {
        LoggingConfig {
            level,
            ..LoggingConfig::json()
        }
    } else {
        LoggingConfig::with_level(level)
    }
}
