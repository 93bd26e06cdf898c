// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use aurora_console_core::console_config::ConsoleConfig;

use crate::console::{load_config, ConsoleOverrides};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./aurora-config.yaml)
        #[arg(short, long, default_value = "./aurora-config.yaml")]
        output: PathBuf,

        /// Include comments for every setting
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, overrides: ConsoleOverrides) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(overrides, paths, yaml).await,
        ConfigCommand::Validate { file } => {
            let overrides = ConsoleOverrides {
                config_path: file.or(overrides.config_path),
                ..overrides
            };
            validate(overrides).await
        }
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(overrides: ConsoleOverrides, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = load_config(&overrides)?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &overrides.config_path {
            println!("  0. --config flag: {}", path.display());
        } else {
            println!("  0. --config flag: {}", "(not set)".dimmed());
        }
        for (i, path) in ConsoleConfig::candidate_paths().iter().enumerate() {
            let marker = if path.exists() { "✓".green() } else { "·".dimmed() };
            println!("  {}. {} {}", i + 1, marker, path.display());
        }
        println!();
    }

    if as_yaml {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "API:".bold());
    println!("  Base URL: {}", config.api.base_url);
    println!("  Session: {}", config.api.session_id);
    println!("  Consent endpoints: {}", config.api.consent_prefix);
    println!();

    println!("{}", "Consent:".bold());
    println!("  Issue attempts: {}", config.consent.issue_attempts);
    println!("  Retry delay: {}ms", config.consent.retry_delay_ms);
    if config.consent.default_ttl_hours == 0 {
        println!("  Default TTL: {}", "single use".dimmed());
    } else {
        println!("  Default TTL: {}h", config.consent.default_ttl_hours);
    }
    println!("  Max challenges per plan: {}", config.consent.max_rounds);
    println!();

    println!("{}", "Events:".bold());
    println!("  Stream: {}", config.events.stream_path);
    println!("  Aggregation window: {}ms", config.events.window_ms);
    println!("  Display lifetime: {}ms", config.events.display_ms);
    println!("  Max visible: {}", config.events.max_visible);
    println!("  Reconnect delay: {}ms", config.events.reconnect_ms);
    println!();

    Ok(())
}

async fn validate(overrides: ConsoleOverrides) -> Result<()> {
    println!("Validating configuration...");

    load_config(&overrides)?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
