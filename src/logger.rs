//! Logging setup using `log` + `env_logger`.
//!
//! Priority for the log level:
//! 1. `-v` count on the command line
//! 2. `RUN_TASK_LOG` environment variable (env_logger filter syntax)
//! 3. default to `warn`

use env_logger::{Builder, Env};
use log::LevelFilter;

pub const LOG_ENV: &str = "RUN_TASK_LOG";

/// Call once, at startup.
pub fn init_logging(verbosity: u8) {
    let mut builder = Builder::from_env(Env::default().filter_or(LOG_ENV, "warn"));
    if let Some(level) = level_from_verbosity(verbosity) {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).format_target(false).init();
}

fn level_from_verbosity(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}
