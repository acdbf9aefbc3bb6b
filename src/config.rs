use glob::Pattern;
use log::{debug, info};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::runner::parser::{Platform, parse_tasks};
use crate::runner::task::TaskDefinition;

pub const DEFAULT_PROJECT_PATTERN: &str = "*.sublime-project";
pub const PROJECT_PATTERN_ENV: &str = "RUN_TASK_PROJECT_PATTERN";

#[derive(Debug, Clone)]
pub struct Settings {
    /// File-name glob used to find the project file in the workspace root.
    pub project_pattern: String,
    /// Explicit project file; skips the search when set.
    pub config_path: Option<PathBuf>,
    pub platform: Platform,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_pattern: DEFAULT_PROJECT_PATTERN.to_string(),
            config_path: None,
            platform: Platform::current(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(pattern) = env::var(PROJECT_PATTERN_ENV).ok().filter(|p| !p.trim().is_empty()) {
            settings.project_pattern = pattern;
        }
        settings
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }
}

/// First regular file in `workspace` (not recursive) whose name matches
/// `pattern`, in file-name order.
pub fn find_project_file(workspace: &Path, pattern: &str) -> Result<Option<PathBuf>, ConfigError> {
    let matcher = Pattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let entries = fs::read_dir(workspace).map_err(|source| ConfigError::Unreadable {
        path: workspace.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| matcher.matches(name))
        })
        .collect();
    candidates.sort();

    Ok(candidates.into_iter().next())
}

pub fn load_document(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(ConfigError::InvalidJson)
}

/// Locates, reads and validates the workspace's tasks.
/// `Ok(None)` means there is no project file to read.
pub fn load_tasks(workspace: &Path, settings: &Settings) -> Result<Option<Vec<TaskDefinition>>, ConfigError> {
    let path = match &settings.config_path {
        Some(path) => workspace.join(path),
        None => match find_project_file(workspace, &settings.project_pattern)? {
            Some(path) => path,
            None => {
                debug!(
                    "No file matching '{}' in {}",
                    settings.project_pattern,
                    workspace.display()
                );
                return Ok(None);
            }
        },
    };

    info!("Loading tasks from: {}", path.display());
    let document = load_document(&path)?;
    parse_tasks(&document, settings.platform).map(Some)
}
