//! CLI subcommands

pub mod completions;
pub mod config;
pub mod nav;
pub mod shell;
pub mod sync;

use std::path::PathBuf;

use ntpsync_core::config::Config;

use crate::output::OutputFormat;

/// Global options shared by every subcommand
#[derive(Debug, Clone)]
pub struct CliContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
}

impl CliContext {
    /// Loads the configuration, falling back to defaults
    pub fn config(&self) -> Config {
        Config::load_or_default(&self.config_path)
    }
}
