//! Config command - View and validate the FileVault configuration

use anyhow::{Context, Result};
use clap::Subcommand;
use filevault_core::config::Config;
use tracing::info;

use super::AppContext;
use crate::output::{plural, Output, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => show(ctx, format),
            ConfigCommand::Validate => validate(ctx, format),
        }
    }
}

fn show(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let out = Output::new(format);
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if out.is_json() {
        return out.json(&ctx.config);
    }

    if ctx.config_path.exists() {
        out.success(&format!("Configuration ({})", ctx.config_path.display()));
    } else {
        out.success("Configuration (defaults, no file found)");
    }
    let yaml = serde_yaml::to_string(&ctx.config).context("Failed to serialize configuration")?;
    for line in yaml.lines() {
        out.line(line);
    }
    Ok(())
}

fn validate(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let out = Output::new(format);
    let path = &ctx.config_path;

    // Load again without the default fallback so parse errors surface
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            let message = if path.exists() {
                format!("Failed to parse configuration: {}", e)
            } else {
                "Configuration file not found. Using defaults.".to_string()
            };
            if out.is_json() {
                out.json(&serde_json::json!({
                    "valid": false,
                    "config_path": path.display().to_string(),
                    "errors": [message],
                }))?;
            } else {
                out.error(&message);
                out.line(&format!("File: {}", path.display()));
            }
            return Ok(());
        }
    };

    info!(config_path = %path.display(), "Validating configuration");
    let errors = config.validate();

    if out.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        out.json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": error_strings,
        }))?;
    } else if errors.is_empty() {
        out.success("Configuration is valid");
        out.line(&format!("File: {}", path.display()));
    } else {
        out.error(&format!(
            "Configuration has {}:",
            plural(errors.len(), "error")
        ));
        out.line(&format!("File: {}", path.display()));
        for error in &errors {
            out.line(&format!("  {} - {}", error.field, error.message));
        }
    }
    Ok(())
}
