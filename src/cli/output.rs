//! Output formatting for multiple formats
//!
//! Every command result can be rendered as JSON, YAML or human-readable text.
//! Machine formats serialize the same structures the library returns; the
//! human format picks out what an operator wants to see first.
//!
//! # Example
//!
//! ```ignore
//! use fallwatch::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Human);
//! println!("{}", formatter.format_history(&tasks)?);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::api::{PerformanceSnapshot, QuickResults, StatusResponse, TaskSummary};
use crate::task::{Task, TaskStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Everything `run` reports about a task
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_results: Option<QuickResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
}

impl RunReport {
    pub fn new(task: Task) -> Self {
        let quick_results = task.result().and_then(|r| r.quick_results());
        Self {
            task,
            quick_results,
            result_url: None,
            download_url: None,
            downloaded_to: None,
            downloaded_bytes: None,
        }
    }
}

/// Output formatter for command results
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_run(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_run_human(report)),
            _ => self.serialize(report, "run report"),
        }
    }

    pub fn format_status(&self, status: &StatusResponse) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_status_human(status)),
            _ => self.serialize(status, "task status"),
        }
    }

    pub fn format_history(&self, tasks: &[TaskSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_history_human(tasks)),
            _ => self.serialize(&tasks, "task history"),
        }
    }

    pub fn format_performance(&self, snapshot: &PerformanceSnapshot) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_performance_human(snapshot)),
            _ => self.serialize(snapshot, "performance settings"),
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }

    fn format_run_human(&self, report: &RunReport) -> String {
        let task = &report.task;
        let mut output = String::new();

        match task.status() {
            TaskStatus::Completed { .. } => output.push_str("\u{2713} Fall Detection Complete\n"),
            TaskStatus::Failed { .. } => output.push_str("\u{2717} Fall Detection Failed\n"),
            _ => output.push_str("\u{25B6} Fall Detection Started\n"),
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        if let Some(id) = task.id() {
            output.push_str(&format!("Task:        {}\n", id));
        }
        if let Some(file) = task.file() {
            output.push_str(&format!(
                "File:        {} ({})\n",
                file.name,
                format_size(file.size)
            ));
        }

        match task.status() {
            TaskStatus::Failed { message, .. } => {
                output.push_str(&format!("Error:       {}\n", message));
            }
            TaskStatus::Detecting {
                progress, message, ..
            } => {
                output.push_str(&format!("Progress:    {}% {}\n", progress, message));
                if let Some(id) = task.id() {
                    output.push_str(&format!("\nFollow up with: fallwatch status {}\n", id));
                }
            }
            _ => {}
        }

        if let Some(quick) = &report.quick_results {
            output.push('\n');
            output.push_str(&format!("Falls:       {}\n", quick.total_falls));
            output.push_str(&format!(
                "Risk Level:  {}\n",
                quick.risk_level.to_string().to_uppercase()
            ));
            output.push_str(&format!(
                "Confidence:  {} {}%\n",
                confidence_bar(quick.average_confidence),
                quick.confidence_percent()
            ));
            if let Some(secs) = quick.processing_time_secs {
                output.push_str(&format!("\nProcessed in {:.1}s\n", secs));
            }
        } else if matches!(task.status(), TaskStatus::Completed { .. }) {
            output.push_str("\nNo summary in the service's result\n");
        }

        if report.result_url.is_some() || report.downloaded_to.is_some() {
            output.push('\n');
        }
        if let Some(url) = &report.result_url {
            output.push_str(&format!("\u{251C}\u{2500} Report:    {}\n", url));
        }
        if let Some(url) = &report.download_url {
            output.push_str(&format!("\u{251C}\u{2500} Video:     {}\n", url));
        }
        if let Some(path) = &report.downloaded_to {
            output.push_str(&format!(
                "\u{2514}\u{2500} Saved:     {} ({})\n",
                path.display(),
                format_size(report.downloaded_bytes.unwrap_or(0))
            ));
        }

        output
    }

    fn format_status_human(&self, status: &StatusResponse) -> String {
        let mut output = String::new();

        let id = status
            .task_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(unknown)".to_string());
        output.push_str(&format!("Task {}\n", id));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Status:    {}\n", status.status));
        output.push_str(&format!(
            "Progress:  {} {}%\n",
            progress_bar(crate::api::clamp_progress(status.progress)),
            crate::api::clamp_progress(status.progress)
        ));
        if let Some(message) = &status.message {
            output.push_str(&format!("Message:   {}\n", message));
        }

        if let Some(quick) = status.result.as_ref().and_then(|r| r.quick_results()) {
            output.push_str(&format!(
                "Falls:     {} (risk {}, confidence {}%)\n",
                quick.total_falls,
                quick.risk_level,
                quick.confidence_percent()
            ));
        }

        output
    }

    fn format_history_human(&self, tasks: &[TaskSummary]) -> String {
        let mut output = String::new();

        output.push_str("Recent Tasks\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        if tasks.is_empty() {
            output.push_str("No tasks yet\n");
            return output;
        }

        for task in tasks {
            let symbol = match task.status {
                crate::api::RemoteStatus::Completed => "\u{2713}",
                crate::api::RemoteStatus::Error => "\u{2717}",
                _ => "\u{2026}",
            };
            let when = task
                .uploaded_at()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| task.upload_time.clone());

            output.push_str(&format!("{} {}  {}\n", symbol, task.id, task.filename));
            output.push_str(&format!(
                "  {}  {} {}%\n",
                when,
                task.status,
                crate::api::clamp_progress(task.progress)
            ));
        }

        output
    }

    fn format_performance_human(&self, snapshot: &PerformanceSnapshot) -> String {
        let mut output = String::new();
        let config = &snapshot.config;

        output.push_str("Detection Engine Settings\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!(
            "GPU:              {}\n",
            if config.use_gpu { "enabled" } else { "disabled" }
        ));
        output.push_str(&format!("Skip Frames:      {}\n", config.skip_frames));
        output.push_str(&format!("Confidence:       {:.2}\n", config.detection_conf));
        output.push_str(&format!("IoU Threshold:    {:.2}\n", config.iou_threshold));

        if let Some(info) = &snapshot.info {
            if let Some(effect) = &info.skip_frames_effect {
                output.push_str(&format!("\n{}\n", effect));
            }
            if let Some(gpu) = &info.gpu_status {
                output.push_str(&format!("GPU status: {}\n", gpu));
            }
        }

        output
    }
}

fn confidence_bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * 10.0) as usize;
    "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled)
}

fn progress_bar(percent: u8) -> String {
    confidence_bar(f64::from(percent) / 100.0)
}

fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / MIB)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
