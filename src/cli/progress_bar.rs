//! Terminal progress bar driven by task events

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;

use crate::progress::{TaskEvent, TaskObserver};

const TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Renders upload and detection progress on stderr.
///
/// Intended for interactive terminals only; `run` falls back to
/// [`LoggingObserver`](crate::progress::LoggingObserver) otherwise.
pub struct ProgressBarObserver {
    bar: ProgressBar,
    finished: Mutex<bool>,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), target);
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self {
            bar,
            finished: Mutex::new(false),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    fn finish(&self, message: String, success: bool) {
        let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        if *finished {
            return;
        }
        *finished = true;
        if success {
            self.bar.set_position(100);
            self.bar.finish_with_message(message);
        } else {
            self.bar.abandon_with_message(message);
        }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskObserver for ProgressBarObserver {
    fn on_event(&self, event: &TaskEvent) {
        match event {
            TaskEvent::FileSelected { .. } => {}
            TaskEvent::UploadStarted { name } => {
                self.bar.set_message(format!("Uploading {}", name));
                self.bar.enable_steady_tick(std::time::Duration::from_millis(120));
            }
            TaskEvent::Uploaded { id, .. } => {
                self.bar.set_message(format!("Uploaded as {}", id));
            }
            TaskEvent::DetectionStarted { .. } => {
                self.bar.set_position(0);
                self.bar.set_message("Detection started");
            }
            TaskEvent::Progress {
                progress, message, ..
            } => {
                self.bar.set_position(u64::from(*progress));
                self.bar.set_message(message.clone());
            }
            TaskEvent::PollSkipped { error, .. } => {
                self.bar.set_message(format!("Status check failed: {}", error));
            }
            TaskEvent::Completed { elapsed, .. } => {
                self.finish(
                    format!("Detection completed in {:.1}s", elapsed.as_secs_f64()),
                    true,
                );
            }
            TaskEvent::Failed { message, .. } => {
                self.finish(format!("Detection failed: {}", message), false);
            }
            TaskEvent::Reset => {
                self.finish("Cancelled".to_string(), false);
            }
        }
    }
}

impl Drop for ProgressBarObserver {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
