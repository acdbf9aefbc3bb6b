use anyhow::{Result, bail};
use colored::*;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::runner::host::Host;
use crate::runner::process::ExecutionOutcome;
use crate::runner::task::TaskArgs;
use crate::runner::{RunOutcome, Selection, TaskRunner};
use crate::terminal::{TerminalHost, TerminalPicker};

/// Entry point for `rt r`. Returns the exit code for the process.
pub fn handle_runner_entry(
    workspace: PathBuf,
    settings: Settings,
    task_name: Option<String>,
    file: Option<PathBuf>,
    dry_run: bool,
) -> Result<i32> {
    let host: Arc<dyn Host> = Arc::new(TerminalHost::new(file.clone()));
    let picker = TerminalPicker::new(task_name);
    let runner = TaskRunner::new(workspace, settings, host, &picker);

    if dry_run {
        return handle_dry_run(&runner, file);
    }

    match runner.run() {
        RunOutcome::NoConfiguration => {
            eprintln!(
                "{} No project file found in {}",
                "⚠️".yellow(),
                runner.workspace().display()
            );
            Ok(0)
        }
        RunOutcome::NoTasks => {
            info!("No tasks defined in configuration");
            Ok(0)
        }
        RunOutcome::Cancelled => Ok(0),
        RunOutcome::Failed(message) => bail!("{}", message),
        // The process stays alive until the relay thread has written the
        // banner.
        RunOutcome::Dispatched(execution) => Ok(match execution.wait() {
            ExecutionOutcome::SpawnFailed => 1,
            ExecutionOutcome::Exited(code) => code,
            ExecutionOutcome::Delegated | ExecutionOutcome::Detached | ExecutionOutcome::Drained => 0,
        }),
    }
}

fn handle_dry_run(runner: &TaskRunner, file: Option<PathBuf>) -> Result<i32> {
    let Selection::Selected(task) = runner.select()? else {
        return Ok(0);
    };

    match &task.args {
        TaskArgs::Editor(args) => {
            let args = serde_json::to_string(args)?;
            println!("{} [DRY-RUN] Editor command: {} {}", "::".yellow(), task.command, args);
        }
        TaskArgs::Shell(_) => {
            if let Some(invocation) = task.shell_invocation(runner.workspace(), file.as_deref()) {
                let mode = if invocation.show_output_panel { "" } else { " (detached)" };
                println!(
                    "{} [DRY-RUN] Executing{}: {}",
                    "::".yellow(),
                    mode,
                    shell_words::join(&invocation.argv)
                );
            }
        }
    }
    Ok(0)
}
