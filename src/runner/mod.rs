pub mod host;
pub mod parser;
pub mod process;
pub mod task;
pub mod variables;

use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Settings, load_tasks};
use crate::errors::{ConfigError, ExecutionError, PLUGIN_NAME};
use self::host::{Host, Picker};
use self::process::{Execution, ExecutionOutcome, execute_shell};
use self::task::{TaskArgs, TaskDefinition};

/// Result of resolving configuration and asking the user to pick.
#[derive(Debug)]
pub enum Selection {
    NoConfiguration,
    NoTasks,
    Cancelled,
    Selected(TaskDefinition),
}

/// Result of one "Run Task" command.
pub enum RunOutcome {
    NoConfiguration,
    NoTasks,
    Cancelled,
    Dispatched(Execution),
    Failed(String),
}

/// One "Run Task" command against a workspace. Nothing is cached: every
/// call re-reads and re-parses the project file.
pub struct TaskRunner<'a> {
    workspace: PathBuf,
    settings: Settings,
    host: Arc<dyn Host>,
    picker: &'a dyn Picker,
}

impl<'a> TaskRunner<'a> {
    pub fn new(workspace: PathBuf, settings: Settings, host: Arc<dyn Host>, picker: &'a dyn Picker) -> Self {
        Self {
            workspace,
            settings,
            host,
            picker,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn select(&self) -> Result<Selection, ConfigError> {
        let Some(tasks) = load_tasks(&self.workspace, &self.settings)? else {
            return Ok(Selection::NoConfiguration);
        };
        if tasks.is_empty() {
            return Ok(Selection::NoTasks);
        }

        let labels: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
        let chosen = self.picker.select(&labels);
        match chosen.and_then(|index| tasks.into_iter().nth(index)) {
            Some(task) => Ok(Selection::Selected(task)),
            None => Ok(Selection::Cancelled),
        }
    }

    pub fn dispatch(&self, task: &TaskDefinition) -> Execution {
        info!("{}: Running task \"{}\"", PLUGIN_NAME, task.name);
        execute_task(task, &self.workspace, self.host.clone())
    }

    pub fn run(&self) -> RunOutcome {
        match self.select() {
            Ok(Selection::NoConfiguration) => RunOutcome::NoConfiguration,
            Ok(Selection::NoTasks) => RunOutcome::NoTasks,
            Ok(Selection::Cancelled) => RunOutcome::Cancelled,
            Ok(Selection::Selected(task)) => RunOutcome::Dispatched(self.dispatch(&task)),
            Err(err) => RunOutcome::Failed(err.to_string()),
        }
    }
}

/// Runs a task with `cwd` as both working directory and `${cwd}`.
pub fn execute_task(task: &TaskDefinition, cwd: &Path, host: Arc<dyn Host>) -> Execution {
    match &task.args {
        TaskArgs::Editor(args) => match host.run_editor_command(&task.command, args) {
            Ok(()) => Execution::finished(ExecutionOutcome::Delegated),
            Err(err) => {
                let err = ExecutionError::new(&task.name, format!("{:#}", err));
                error!("{}", err);
                host.error_message(&err.to_string());
                Execution::finished(ExecutionOutcome::SpawnFailed)
            }
        },
        TaskArgs::Shell(_) => {
            let file = host.active_file();
            match task.shell_invocation(cwd, file.as_deref()) {
                Some(invocation) => execute_shell(invocation, host),
                None => Execution::finished(ExecutionOutcome::SpawnFailed),
            }
        }
    }
}
