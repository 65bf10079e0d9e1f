//! Config command - Inspect the NTPSync configuration
//!
//! Provides the `ntpsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Prints where the configuration file is expected

use anyhow::{Context, Result};
use clap::Subcommand;
use ntpsync_core::config::{Config, ValidationError};
use tracing::info;

use super::CliContext;
use crate::output::get_formatter;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the config command
    pub fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Validate => execute_validate(ctx),
            ConfigCommand::Path => execute_path(ctx),
        }
    }
}

fn execute_show(ctx: &CliContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let config = ctx.config();

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        let origin = if ctx.config_path.exists() {
            ctx.config_path.display().to_string()
        } else {
            "defaults".to_string()
        };
        formatter.success(&format!("Configuration ({origin})"));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_validate(ctx: &CliContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let path = &ctx.config_path;

    if !path.exists() {
        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": true,
                "config_path": path.display().to_string(),
                "errors": [],
                "defaults": true,
            }));
        } else {
            formatter.info(&format!("Configuration file not found at {}", path.display()));
            formatter.info("The built-in defaults are in effect.");
        }
        return Ok(());
    }

    let errors = match Config::load(path) {
        Ok(config) => config.validate(),
        Err(e) => vec![ValidationError {
            field: "(file)".to_string(),
            message: format!("Failed to parse configuration: {e}"),
        }],
    };

    info!(config_path = %path.display(), errors = errors.len(), "Validated configuration");

    if ctx.format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

fn execute_path(ctx: &CliContext) -> Result<()> {
    if ctx.format.is_json() {
        get_formatter(ctx.format).print_json(&serde_json::json!({
            "config_path": ctx.config_path.display().to_string(),
            "exists": ctx.config_path.exists(),
        }));
    } else {
        println!("{}", ctx.config_path.display());
    }
    Ok(())
}
