// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Live event commands
//!
//! Commands: watch

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::console::{cancel_on_interrupt, load_config, Console, ConsoleOverrides};

#[derive(Subcommand)]
pub enum EventsCommand {
    /// Stream operational events, collapsing bursts of the same kind
    Watch {
        /// Aggregation window in milliseconds (overrides config)
        #[arg(long, value_name = "MS")]
        window_ms: Option<u64>,

        /// Notification lifetime in milliseconds (overrides config)
        #[arg(long, value_name = "MS")]
        display_ms: Option<u64>,
    },
}

pub async fn handle_command(command: EventsCommand, overrides: ConsoleOverrides) -> Result<()> {
    match command {
        EventsCommand::Watch { window_ms, display_ms } => {
            let mut config = load_config(&overrides)?;
            if let Some(ms) = window_ms {
                config.events.window_ms = ms;
            }
            if let Some(ms) = display_ms {
                config.events.display_ms = ms;
            }
            config.validate().context("Invalid event settings")?;
            watch(Console::new(config)?).await
        }
    }
}

async fn watch(console: Console) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    println!(
        "{} {} {}",
        "Watching".bold(),
        console.config.events.stream_path,
        "(Ctrl-C to stop)".dimmed()
    );

    let mut engine = console.aggregation_engine();
    let stats = console
        .event_ingest(cancel.clone())
        .run(&mut engine, cancel)
        .await
        .context("Failed to subscribe to event stream")?;
    engine.clear();

    info!(delivered = stats.delivered, dropped = stats.dropped, "Event watch stopped");
    println!(
        "{} {} events, {} malformed",
        "Stopped.".dimmed(),
        stats.delivered,
        stats.dropped
    );

    Ok(())
}
