use serde_json::{Map, Value};

use crate::errors::{ConfigError, Expected, FieldError};
use crate::runner::task::{TaskArgs, TaskDefinition, TaskKind};

pub const TASKS_KEY: &str = "tasks";
pub const NAME_KEY: &str = "name";
pub const TYPE_KEY: &str = "type";
pub const COMMAND_KEY: &str = "command";
pub const ARGS_KEY: &str = "args";
pub const SHOW_OUTPUT_PANEL_KEY: &str = "show_output_panel";
pub const WINDOWS_KEY: &str = "windows";

const SHOW_OUTPUT_PANEL_DEFAULT: bool = true;

/// Decides whether the `windows` override block is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

type FieldResult<T> = Result<T, FieldError>;

/// Validates the whole document. Fails fast: the first bad entry aborts
/// the parse and no partial list is returned.
pub fn parse_tasks(document: &Value, platform: Platform) -> Result<Vec<TaskDefinition>, ConfigError> {
    let Value::Object(root) = document else {
        return Err(ConfigError::InvalidDocument { expected: None });
    };
    let Some(Value::Array(entries)) = root.get(TASKS_KEY) else {
        return Err(ConfigError::InvalidDocument {
            expected: Some("\"tasks\" array"),
        });
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            parse_task(entry, platform).map_err(|source| ConfigError::TaskDefinition { index, source })
        })
        .collect()
}

pub fn parse_task(entry: &Value, platform: Platform) -> FieldResult<TaskDefinition> {
    let Value::Object(task) = entry else {
        return Err(FieldError::InvalidValue {
            field: TASKS_KEY,
            expected: Expected::JsonObject,
        });
    };

    let name = parse_non_empty_string(task, NAME_KEY)?;
    let kind = parse_kind(task)?;

    // Command and args come from the override block when it applies.
    let source = parse_windows_override(task, platform)?.unwrap_or(task);
    let command = parse_non_empty_string(source, COMMAND_KEY)?;
    let args = parse_args(source, kind)?;

    let show_output_panel = parse_show_output_panel(task)?;

    Ok(TaskDefinition {
        name,
        kind,
        command,
        args,
        show_output_panel,
    })
}

fn parse_non_empty_string(task: &Map<String, Value>, field: &'static str) -> FieldResult<String> {
    let value = task.get(field).ok_or(FieldError::Missing(field))?;
    match value.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(FieldError::InvalidValue {
            field,
            expected: Expected::NonEmptyString,
        }),
    }
}

fn parse_kind(task: &Map<String, Value>) -> FieldResult<TaskKind> {
    let value = task.get(TYPE_KEY).ok_or(FieldError::Missing(TYPE_KEY))?;
    value
        .as_str()
        .and_then(TaskKind::from_type_name)
        .ok_or(FieldError::InvalidValue {
            field: TYPE_KEY,
            expected: Expected::TaskType,
        })
}

fn parse_windows_override(
    task: &Map<String, Value>,
    platform: Platform,
) -> FieldResult<Option<&Map<String, Value>>> {
    if platform != Platform::Windows {
        return Ok(None);
    }
    match task.get(WINDOWS_KEY) {
        None => Ok(None),
        Some(Value::Object(block)) => Ok(Some(block)),
        Some(_) => Err(FieldError::InvalidValue {
            field: WINDOWS_KEY,
            expected: Expected::JsonObject,
        }),
    }
}

fn parse_args(task: &Map<String, Value>, kind: TaskKind) -> FieldResult<TaskArgs> {
    let invalid = |expected| FieldError::InvalidValue {
        field: ARGS_KEY,
        expected,
    };

    let Some(value) = task.get(ARGS_KEY) else {
        return Ok(match kind {
            TaskKind::Editor => TaskArgs::Editor(Map::new()),
            TaskKind::Shell => TaskArgs::Shell(Vec::new()),
        });
    };

    match (kind, value) {
        (TaskKind::Editor, Value::Object(map)) => Ok(TaskArgs::Editor(map.clone())),
        (TaskKind::Editor, _) => Err(invalid(Expected::JsonObject)),
        (TaskKind::Shell, Value::String(line)) => shell_words::split(line.trim())
            .map(TaskArgs::Shell)
            .map_err(|_| invalid(Expected::BalancedQuotes)),
        (TaskKind::Shell, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(String::from))
            .collect::<Option<Vec<_>>>()
            .map(TaskArgs::Shell)
            .ok_or(invalid(Expected::StringArray)),
        (TaskKind::Shell, _) => Err(invalid(Expected::StringOrArray)),
    }
}

fn parse_show_output_panel(task: &Map<String, Value>) -> FieldResult<bool> {
    match task.get(SHOW_OUTPUT_PANEL_KEY) {
        None => Ok(SHOW_OUTPUT_PANEL_DEFAULT),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(FieldError::InvalidValue {
            field: SHOW_OUTPUT_PANEL_KEY,
            expected: Expected::BoolValue,
        }),
    }
}
