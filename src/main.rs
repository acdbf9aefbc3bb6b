mod cli;
mod config;
mod errors;
mod handlers;
mod logger;
mod runner;
mod terminal;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use handlers::{list, task};
use std::env;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logging(cli.verbose);

    let workspace = match cli.workspace {
        Some(path) => path,
        None => env::current_dir()?,
    };
    let settings = Settings::from_env().with_config_path(cli.config);

    let code = match cli.command.unwrap_or_default() {
        Commands::List => {
            list::handle_list(&workspace, &settings)?;
            0
        }
        Commands::R {
            task: task_name,
            file,
            dry_run,
        } => task::handle_runner_entry(workspace, settings, task_name, file, dry_run)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
