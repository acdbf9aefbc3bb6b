use anyhow::Result;
use colored::*;
use std::path::Path;

use crate::config::{Settings, load_tasks};
use crate::runner::task::{TaskArgs, TaskDefinition};

pub fn handle_list(workspace: &Path, settings: &Settings) -> Result<()> {
    let Some(tasks) = load_tasks(workspace, settings)? else {
        println!("No project file found in {}.", workspace.display());
        return Ok(());
    };

    if tasks.is_empty() {
        println!("No tasks defined in configuration.");
        return Ok(());
    }

    println!("{}", "Available Tasks:".bold().underline());

    // Same numbering as the interactive prompt.
    let max_len = tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for (idx, task) in tasks.iter().enumerate() {
        let padding = " ".repeat(max_len - task.name.len() + 2);
        println!(
            "  {:>2}) {}{}{}",
            idx + 1,
            task.name.cyan(),
            padding,
            describe(task).italic()
        );
    }

    Ok(())
}

fn describe(task: &TaskDefinition) -> String {
    let mut line = format!("{}: {}", task.kind.type_name(), task.command);
    if let TaskArgs::Shell(args) = &task.args {
        if !args.is_empty() {
            line.push(' ');
            line.push_str(&shell_words::join(args));
        }
    }
    if !task.show_output_panel {
        line.push_str(" (detached)");
    }
    line
}
