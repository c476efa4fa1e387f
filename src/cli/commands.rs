use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Client for the fall-detection video service
#[derive(Parser, Debug)]
#[command(
    name = "fallwatch",
    about = "Upload videos to a fall-detection service and follow the analysis",
    version,
    author,
    long_about = "fallwatch uploads a video to a fall-detection service, starts detection, \
                  polls until the analysis finishes and prints the headline results. It can \
                  also list recent tasks, tune the detection engine and download the \
                  annotated output video."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 's',
        long,
        global = true,
        value_name = "URL",
        help = "Detection service URL (overrides FALLWATCH_SERVER_URL)"
    )]
    pub server: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "MS",
        help = "Delay between status checks in milliseconds"
    )]
    pub poll_interval_ms: Option<u64>,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        value_parser = parse_timeout,
        help = "Timeout for status and control requests"
    )]
    pub timeout: Option<u64>,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress progress output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Upload a video and run fall detection on it",
        long_about = "Validates and uploads the video, starts detection with the given \
                      thresholds and waits for the result.\n\n\
                      Examples:\n  \
                      fallwatch run hallway.mp4\n  \
                      fallwatch run hallway.mp4 --confidence 0.6 --iou 0.5\n  \
                      fallwatch run hallway.mp4 --download annotated.mp4\n  \
                      fallwatch run hallway.mp4 --no-wait"
    )]
    Run(RunArgs),

    #[command(
        about = "Show the current status of a task",
        long_about = "Fetches one status report for a task id.\n\n\
                      Examples:\n  \
                      fallwatch status abc123\n  \
                      fallwatch status abc123 --format json"
    )]
    Status(StatusArgs),

    #[command(
        about = "List recent tasks",
        long_about = "Lists tasks known to the service, newest first.\n\n\
                      Examples:\n  \
                      fallwatch history\n  \
                      fallwatch history --limit 20"
    )]
    History(HistoryArgs),

    #[command(about = "Show or change detection engine settings")]
    Perf(PerfArgs),

    #[command(
        about = "Download the annotated video for a finished task",
        long_about = "Streams the processed video to a local file.\n\n\
                      Examples:\n  \
                      fallwatch download abc123 -o result.mp4"
    )]
    Download(DownloadArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "FILE", help = "Video to analyze (mp4, avi or mov)")]
    pub file: PathBuf,

    #[arg(
        short = 'c',
        long,
        default_value = "0.5",
        value_parser = parse_threshold,
        help = "Detection confidence threshold (0.0-1.0)"
    )]
    pub confidence: f64,

    #[arg(
        long,
        default_value = "0.45",
        value_parser = parse_threshold,
        help = "IoU threshold for overlapping detections (0.0-1.0)"
    )]
    pub iou: f64,

    #[arg(long, help = "Return once detection has started instead of waiting")]
    pub no_wait: bool,

    #[arg(
        short = 'd',
        long,
        value_name = "PATH",
        conflicts_with = "no_wait",
        help = "Save the annotated video here after completion"
    )]
    pub download: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    #[arg(value_name = "TASK_ID")]
    pub id: String,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryArgs {
    #[arg(
        short = 'n',
        long,
        default_value = "5",
        help = "Maximum number of tasks to show"
    )]
    pub limit: usize,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PerfArgs {
    #[command(subcommand)]
    pub action: PerfAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PerfAction {
    #[command(about = "Print current engine settings")]
    Show {
        #[arg(
            short = 'f',
            long,
            value_enum,
            default_value = "human",
            help = "Output format"
        )]
        format: OutputFormatArg,
    },

    #[command(
        about = "Change engine settings",
        long_about = "Sends only the settings given. The service clamps values it \
                      considers out of range.\n\n\
                      Examples:\n  \
                      fallwatch perf set --skip-frames 2\n  \
                      fallwatch perf set --gpu false --conf 0.6"
    )]
    Set {
        #[arg(long, value_name = "BOOL", action = ArgAction::Set, help = "Use the GPU when available")]
        gpu: Option<bool>,

        #[arg(long, value_name = "N", help = "Analyze every Nth frame")]
        skip_frames: Option<u32>,

        #[arg(long, value_parser = parse_threshold, help = "Default confidence threshold")]
        conf: Option<f64>,

        #[arg(long, value_parser = parse_threshold, help = "Default IoU threshold")]
        iou: Option<f64>,

        #[arg(
            short = 'f',
            long,
            value_enum,
            default_value = "human",
            help = "Output format"
        )]
        format: OutputFormatArg,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct DownloadArgs {
    #[arg(value_name = "TASK_ID")]
    pub id: String,

    #[arg(short = 'o', long, value_name = "PATH", help = "Destination file")]
    pub output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_timeout(s: &str) -> Result<u64, String> {
    crate::config::parse_positive_secs("timeout", s).map_err(|e| e.to_string())
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is outside 0.0-1.0", value))
    }
}
