use fallwatch::cli::commands::{CliArgs, Commands};
use fallwatch::cli::handlers::{
    handle_download, handle_history, handle_perf, handle_run, handle_status,
};
use fallwatch::util::logging::{self, LoggingConfig};
use fallwatch::VERSION;

use clap::Parser;
use std::env;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("fallwatch v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(&args, run_args).await,
        Commands::Status(status_args) => handle_status(&args, status_args).await,
        Commands::History(history_args) => handle_history(&args, history_args).await,
        Commands::Perf(perf_args) => handle_perf(&args, perf_args).await,
        Commands::Download(download_args) => handle_download(&args, download_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let base = args
        .log_level
        .clone()
        .or_else(|| env::var("FALLWATCH_LOG_LEVEL").ok())
        .map(|level| logging::parse_level(&level))
        .unwrap_or(tracing::Level::WARN);

    let mut config = LoggingConfig::from_verbosity(base, args.verbose, args.quiet);

    let json = env::var("FALLWATCH_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);
    if json {
        config = LoggingConfig {
            level: config.level,
            ..LoggingConfig::json()
        };
    }

    logging::init_logging(config);
}
