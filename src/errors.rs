use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const PLUGIN_NAME: &str = "Run Task";

/// What a field validator expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    BoolValue,
    JsonObject,
    StringOrArray,
    StringArray,
    BalancedQuotes,
    NonEmptyString,
    TaskType,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Expected::BoolValue => "Expected a boolean value.",
            Expected::JsonObject => "Expected a JSON object.",
            Expected::StringOrArray => "Expected a string or array value.",
            Expected::StringArray => "Expected an array of strings.",
            Expected::BalancedQuotes => "Expected a string with balanced quotes.",
            Expected::NonEmptyString => {
                "Expected a non-empty string with at least one non-whitespace character."
            }
            Expected::TaskType => "Expected \"shell\" or \"sublime\".",
        };
        f.write_str(text)
    }
}

/// A single task entry failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Missing required field \"{0}\".")]
    Missing(&'static str),
    #[error("Invalid value for field \"{field}\". {expected}")]
    InvalidValue {
        field: &'static str,
        expected: Expected,
    },
}

impl FieldError {
    #[cfg(test)]
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::Missing(field) => *field,
            FieldError::InvalidValue { field, .. } => *field,
        }
    }
}

/// Anything that stops the configuration from producing a task list.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Run Task: Unable to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Run Task: Invalid project file pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Run Task: Invalid JSON. Please check the project file.")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Run Task: Invalid JSON object. {}Please check the project file.", expected_prefix(.expected))]
    InvalidDocument { expected: Option<&'static str> },

    #[error(
        "Run Task: Invalid JSON task definition at index {index}. Please check the project file.\n\nError message: {source}"
    )]
    TaskDefinition {
        index: usize,
        #[source]
        source: FieldError,
    },
}

fn expected_prefix(expected: &Option<&'static str>) -> String {
    match expected {
        Some(name) => format!("Expected {}. ", name),
        None => String::new(),
    }
}

/// A task could not be started. Scoped to one invocation.
#[derive(Debug, Error)]
#[error("Run Task: Execution failed for task \"{task}\".\n\nError message: {message}")]
pub struct ExecutionError {
    pub task: String,
    pub message: String,
}

impl ExecutionError {
    pub fn new(task: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            task: task.into(),
            message: message.to_string(),
        }
    }
}
