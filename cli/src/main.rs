// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Aurora Console CLI
//!
//! The `aurora` binary is a terminal console for an Aurora agent service.
//!
//! ## Commands
//!
//! - `aurora plan <INPUT>` - Ask the planner for steps
//! - `aurora run <INPUT>` - Plan and execute, prompting for consent when challenged
//! - `aurora consent request` - Request consent for a single action
//! - `aurora events watch` - Stream operational events with burst aggregation
//! - `aurora config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use aurora_console::commands::{self, ConfigCommand, ConsentCommand, EventsCommand, PlanArgs, RunArgs};
use aurora_console::console::ConsoleOverrides;

/// Aurora Console - run agent plans behind explicit consent
#[derive(Parser)]
#[command(name = "aurora")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AURORA_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Aurora service URL (overrides api.base_url)
    #[arg(long, global = true, env = "AURORA_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// Session identifier (overrides api.session_id)
    #[arg(long, global = true, env = "AURORA_SESSION_ID")]
    session_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AURORA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a plan without executing it
    #[command(name = "plan")]
    Plan(PlanArgs),

    /// Plan and execute, resolving consent challenges
    #[command(name = "run")]
    Run(RunArgs),

    /// Consent operations
    #[command(name = "consent")]
    Consent {
        #[command(subcommand)]
        command: ConsentCommand,
    },

    /// Live operational events
    #[command(name = "events")]
    Events {
        #[command(subcommand)]
        command: EventsCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let overrides = ConsoleOverrides {
        config_path: cli.config,
        api_url: cli.api_url,
        session_id: cli.session_id,
    };

    match cli.command {
        Some(Commands::Plan(args)) => commands::plan::plan(args, overrides).await,
        Some(Commands::Run(args)) => commands::plan::run(args, overrides).await,
        Some(Commands::Consent { command }) => commands::consent::handle_command(command, overrides).await,
        Some(Commands::Events { command }) => commands::events::handle_command(command, overrides).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, overrides).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
