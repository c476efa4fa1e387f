pub mod commands;
pub mod handlers;
pub mod output;
pub mod progress_bar;

pub use commands::{CliArgs, Commands, OutputFormatArg};
pub use output::{OutputFormat, OutputFormatter, RunReport};
pub use progress_bar::ProgressBarObserver;
