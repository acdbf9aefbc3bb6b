use serde_json::{Map, Value};
use std::path::Path;

use crate::runner::process::ShellInvocation;
use crate::runner::variables::substitute;

/// How a task's command is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Dispatched to the host editor's own command table ("sublime").
    Editor,
    /// Spawned as an OS process ("shell").
    Shell,
}

impl TaskKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "sublime" => Some(TaskKind::Editor),
            "shell" => Some(TaskKind::Shell),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            TaskKind::Editor => "sublime",
            TaskKind::Shell => "shell",
        }
    }
}

/// Arguments, already checked against the task kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskArgs {
    /// Forwarded verbatim to the editor command.
    Editor(Map<String, Value>),
    /// Argument vector following the program name.
    Shell(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub name: String,
    pub kind: TaskKind,
    pub command: String,
    pub args: TaskArgs,
    pub show_output_panel: bool,
}

impl TaskDefinition {
    /// Full argv for a shell task with `${cwd}` and `${file}` expanded.
    /// Editor tasks have no process invocation.
    pub fn shell_invocation(&self, cwd: &Path, file: Option<&Path>) -> Option<ShellInvocation> {
        let TaskArgs::Shell(args) = &self.args else {
            return None;
        };

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.command.clone());
        argv.extend(args.iter().cloned());

        let substituted = substitute(&argv, cwd, file);
        Some(ShellInvocation {
            task_name: self.name.clone(),
            argv: substituted.args,
            cwd: cwd.to_path_buf(),
            has_file_variable: substituted.has_file_variable,
            show_output_panel: self.show_output_panel,
        })
    }
}
