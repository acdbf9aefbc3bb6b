use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rt", version, about = "Run Task: pick a project task and run it")]
pub struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(short = 'w', long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Project file to read, relative to the workspace (skips the search)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Pick a task and run it (default)
    R {
        /// Run this task instead of prompting
        task: Option<String>,

        /// Path bound to ${file}
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,

        /// Print the resolved command without executing it
        #[arg(short = 'd', long = "dry-run")]
        dry_run: bool,
    },

    /// List all tasks in the project file
    #[command(visible_alias = "ls")]
    List,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::R {
            task: None,
            file: None,
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_with_task_and_file() {
        let cli = Cli::try_parse_from(["rt", "r", "Build", "-f", "src/main.rs", "-w", "/ws"]).unwrap();
        assert_eq!(cli.workspace, Some(PathBuf::from("/ws")));
        assert_eq!(
            cli.command,
            Some(Commands::R {
                task: Some("Build".to_string()),
                file: Some(PathBuf::from("src/main.rs")),
                dry_run: false,
            })
        );
    }

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["rt", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
    }

    #[test]
    fn test_list_alias() {
        let cli = Cli::try_parse_from(["rt", "ls", "-c", "tasks.json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::List));
        assert_eq!(cli.config, Some(PathBuf::from("tasks.json")));
    }
}
