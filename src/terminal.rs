use anyhow::{Context, Result};
use colored::*;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::runner::host::{Host, OutputSink, Picker};

/// Wire format for editor commands forwarded on stdout.
#[derive(Serialize)]
struct EditorInvocation<'a> {
    command: &'a str,
    args: &'a Map<String, Value>,
}

/// Host used by the `rt` binary. There is no editor behind it, so editor
/// commands are written to stdout as one JSON line for a bridge to pick up.
pub struct TerminalHost {
    active_file: Option<PathBuf>,
}

impl TerminalHost {
    pub fn new(active_file: Option<PathBuf>) -> Self {
        Self { active_file }
    }
}

impl Host for TerminalHost {
    fn run_editor_command(&self, command: &str, args: &Map<String, Value>) -> Result<()> {
        let line = serde_json::to_string(&EditorInvocation { command, args })
            .context("Failed to encode editor command")?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", line).context("Failed to forward editor command")?;
        stdout.flush().context("Failed to forward editor command")?;
        Ok(())
    }

    fn create_output_sink(&self, task_name: &str) -> Box<dyn OutputSink> {
        Box::new(ConsoleSink::new(task_name))
    }

    fn restore_focus(&self) {
        debug!("Restoring focus to the previously active view");
    }

    fn active_file(&self) -> Option<PathBuf> {
        self.active_file.clone()
    }

    fn error_message(&self, message: &str) {
        eprintln!("{} {}", "❌".red(), message);
    }
}

/// Streams task output straight to stdout.
pub struct ConsoleSink {
    task_name: String,
    at_line_start: bool,
}

impl ConsoleSink {
    pub fn new(task_name: &str) -> Self {
        Self {
            task_name: task_name.to_string(),
            at_line_start: true,
        }
    }
}

impl OutputSink for ConsoleSink {
    fn show(&mut self) {
        eprintln!("{} Running task: {}", "⚡".yellow(), self.task_name.bold());
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut stdout = io::stdout().lock();
        // A closed stdout must not take the relay thread down with it.
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
        self.at_line_start = text.ends_with('\n');
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        if !self.at_line_start {
            println!();
        }
    }
}

/// Numbered prompt on stdin, or a task chosen up front by name.
pub struct TerminalPicker {
    preselected: Option<String>,
}

impl TerminalPicker {
    pub fn new(preselected: Option<String>) -> Self {
        Self { preselected }
    }
}

impl Picker for TerminalPicker {
    fn select(&self, labels: &[String]) -> Option<usize> {
        if let Some(name) = &self.preselected {
            let found = labels.iter().position(|label| label == name.trim());
            if found.is_none() {
                eprintln!("{} Task '{}' not found", "⚠️".yellow(), name);
            }
            return found;
        }

        for (idx, label) in labels.iter().enumerate() {
            eprintln!("  {:>2}) {}", idx + 1, label.cyan());
        }
        eprint!("Select a task [1-{}]: ", labels.len());
        let _ = io::stderr().flush();

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => parse_choice(&input, labels),
        }
    }
}

/// 1-based number or exact label. Blank input or `q` cancels.
pub fn parse_choice(input: &str, labels: &[String]) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("q") {
        return None;
    }
    if let Ok(number) = input.parse::<usize>() {
        return (1..=labels.len()).contains(&number).then(|| number - 1);
    }
    labels.iter().position(|label| label == input)
}
