//! Command handlers
//!
//! Each handler returns the process exit code. Failures are reported through
//! `tracing` and on stderr; stdout only ever carries formatted results.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::commands::{
    CliArgs, DownloadArgs, HistoryArgs, OutputFormatArg, PerfAction, PerfArgs, RunArgs,
    StatusArgs,
};
use super::output::{OutputFormat, OutputFormatter, RunReport};
use super::progress_bar::ProgressBarObserver;
use crate::api::{DetectionBackend, DetectionParams, HttpBackend, PerformanceUpdate, TaskId};
use crate::config::ClientConfig;
use crate::progress::{LoggingObserver, TaskObserver};
use crate::task::{FilePreview, TaskController, VideoFile};

/// Builds the effective configuration: environment first, then flags
pub fn resolve_config(args: &CliArgs) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    if let Some(server) = &args.server {
        config.server_url = server.trim_end_matches('/').to_string();
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(secs) = args.timeout {
        config.request_timeout_secs = secs;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }

    config.validate().context("Invalid configuration")?;
    debug!("{}", config);
    Ok(config)
}

fn connect(config: &ClientConfig) -> Result<Arc<HttpBackend>> {
    let backend = HttpBackend::from_config(config)
        .with_context(|| format!("Failed to create client for {}", config.server_url))?;
    Ok(Arc::new(backend))
}

fn exit_code(command: &str, result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{} failed: {:#}", command, e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn emit(output: String) {
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
}

pub async fn handle_run(cli: &CliArgs, args: &RunArgs) -> i32 {
    exit_code("run", run(cli, args).await)
}

async fn run(cli: &CliArgs, args: &RunArgs) -> Result<()> {
    let config = resolve_config(cli)?;
    let backend = connect(&config)?;

    let interactive = atty::is(atty::Stream::Stderr);
    let observer: Arc<dyn TaskObserver> =
        if interactive && !cli.quiet && args.format == OutputFormatArg::Human {
            Arc::new(ProgressBarObserver::new())
        } else {
            Arc::new(LoggingObserver)
        };

    let mut controller = TaskController::from_config(backend.clone(), &config)
        .with_observer(observer)
        .with_preview_provider(Arc::new(FilePreview));

    let file = VideoFile::from_path(&args.file)
        .with_context(|| format!("Cannot read {}", args.file.display()))?;
    controller.select(file)?;
    if let Some(preview) = controller.preview_location() {
        debug!(preview = %preview, "Preview available");
    }

    let id = controller.upload().await?;
    controller
        .start_detection(DetectionParams {
            confidence: args.confidence,
            iou_threshold: args.iou,
        })
        .await?;

    let formatter = OutputFormatter::new(args.format.into());

    if args.no_wait {
        info!(task_id = %id, "Detection running, not waiting for result");
        let report = RunReport::new(controller.snapshot());
        emit(formatter.format_run(&report)?);
        return Ok(());
    }

    let task = controller.wait().await?;

    let mut report = RunReport::new(task);
    report.result_url = Some(backend.result_url(&id));
    report.download_url = Some(backend.download_url(&id));

    if let Some(dest) = &args.download {
        let bytes = backend
            .download_result(&id, dest)
            .await
            .with_context(|| format!("Failed to download result to {}", dest.display()))?;
        info!(task_id = %id, bytes, path = %dest.display(), "Result video saved");
        report.downloaded_to = Some(dest.clone());
        report.downloaded_bytes = Some(bytes);
    }

    emit(formatter.format_run(&report)?);
    Ok(())
}

pub async fn handle_status(cli: &CliArgs, args: &StatusArgs) -> i32 {
    exit_code("status", status(cli, args).await)
}

async fn status(cli: &CliArgs, args: &StatusArgs) -> Result<()> {
    let config = resolve_config(cli)?;
    let backend = connect(&config)?;
    let id = TaskId::new(args.id.trim());

    let mut status = backend
        .status(&id)
        .await
        .with_context(|| format!("Failed to fetch status of task {}", id))?;
    if status.task_id.is_none() {
        status.task_id = Some(id);
    }

    let formatter = OutputFormatter::new(args.format.into());
    emit(formatter.format_status(&status)?);
    Ok(())
}

pub async fn handle_history(cli: &CliArgs, args: &HistoryArgs) -> i32 {
    exit_code("history", history(cli, args).await)
}

async fn history(cli: &CliArgs, args: &HistoryArgs) -> Result<()> {
    let config = resolve_config(cli)?;
    let backend = connect(&config)?;

    let mut tasks = backend.list_tasks().await.context("Failed to list tasks")?;
    tasks.truncate(args.limit);

    let formatter = OutputFormatter::new(args.format.into());
    emit(formatter.format_history(&tasks)?);
    Ok(())
}

pub async fn handle_perf(cli: &CliArgs, args: &PerfArgs) -> i32 {
    exit_code("perf", perf(cli, args).await)
}

async fn perf(cli: &CliArgs, args: &PerfArgs) -> Result<()> {
    let config = resolve_config(cli)?;
    let backend = connect(&config)?;

    let (snapshot, format) = match &args.action {
        PerfAction::Show { format } => (
            backend
                .performance()
                .await
                .context("Failed to read performance settings")?,
            *format,
        ),
        PerfAction::Set {
            gpu,
            skip_frames,
            conf,
            iou,
            format,
        } => {
            let update = PerformanceUpdate {
                use_gpu: *gpu,
                skip_frames: *skip_frames,
                detection_conf: *conf,
                iou_threshold: *iou,
            };
            if update.is_empty() {
                bail!("Nothing to change; pass at least one of --gpu, --skip-frames, --conf, --iou");
            }
            let snapshot = backend
                .update_performance(&update)
                .await
                .context("Failed to update performance settings")?;
            info!(?update, "Performance settings updated");
            (snapshot, *format)
        }
    };

    let formatter = OutputFormatter::new(OutputFormat::from(format));
    emit(formatter.format_performance(&snapshot)?);
    Ok(())
}

pub async fn handle_download(cli: &CliArgs, args: &DownloadArgs) -> i32 {
    exit_code("download", download(cli, args).await)
}

async fn download(cli: &CliArgs, args: &DownloadArgs) -> Result<()> {
    let config = resolve_config(cli)?;
    let backend = connect(&config)?;
    let id = TaskId::new(args.id.trim());

    let bytes = backend
        .download_result(&id, &args.output)
        .await
        .with_context(|| format!("Failed to download result of task {}", id))?;

    if !cli.quiet {
        println!("Saved {} bytes to {}", bytes, args.output.display());
    }
    Ok(())
}
