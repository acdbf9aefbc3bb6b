use anyhow::Result;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// The environment a task runs in. Shared with background execution
/// threads, so it must be `Send + Sync`.
pub trait Host: Send + Sync {
    /// Runs one of the host's own commands ("sublime" tasks).
    fn run_editor_command(&self, command: &str, args: &Map<String, Value>) -> Result<()>;

    /// A fresh live display for one task invocation.
    fn create_output_sink(&self, task_name: &str) -> Box<dyn OutputSink>;

    /// Gives focus back to whatever view was active before the task ran.
    fn restore_focus(&self);

    /// Path bound to `${file}`.
    fn active_file(&self) -> Option<PathBuf>;

    fn error_message(&self, message: &str);
}

/// Receives streamed process output. Owned by a single background thread.
pub trait OutputSink: Send {
    fn show(&mut self);
    fn write(&mut self, text: &str);
}

/// Presents task labels and returns the chosen index, or `None` on cancel.
pub trait Picker {
    fn select(&self, labels: &[String]) -> Option<usize>;
}
