// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consent commands
//!
//! Commands: request

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use aurora_console_core::application::DecisionPrompt;
use aurora_console_core::consent::{ConsentDecision, ConsentRequest, ConsentScope, Rationale, RiskLevel};

use crate::commands::plan::preset_decision;
use crate::console::{load_config, Console, ConsoleOverrides, TerminalPrompt};

#[derive(Subcommand)]
pub enum ConsentCommand {
    /// Request consent for an action and record a decision
    Request {
        /// Action name, e.g. mail.send
        #[arg(long)]
        action: String,

        /// Why the action is needed
        #[arg(long)]
        purpose: String,

        /// Consent scope (mail, files, system, browser, nlp, ocr); derived from the action if omitted
        #[arg(long)]
        scope: Option<ConsentScope>,

        /// Risk level (low, medium, high)
        #[arg(long, default_value = "high")]
        risk: RiskLevel,

        /// Hours the decision stays valid (0 = single use, max 168)
        #[arg(long)]
        ttl_hours: Option<u32>,

        /// Why the action is wanted, shown with the prompt
        #[arg(long)]
        why: Option<String>,

        /// How the action will be carried out, shown with the prompt
        #[arg(long)]
        how: Option<String>,

        /// Approve without prompting
        #[arg(long, conflicts_with = "deny")]
        approve: bool,

        /// Deny without prompting
        #[arg(long)]
        deny: bool,
    },
}

pub async fn handle_command(command: ConsentCommand, overrides: ConsoleOverrides) -> Result<()> {
    match command {
        ConsentCommand::Request {
            action,
            purpose,
            scope,
            risk,
            ttl_hours,
            why,
            how,
            approve,
            deny,
        } => {
            let console = Console::new(load_config(&overrides)?)?;
            let request = ConsentRequest {
                scope: scope.unwrap_or_else(|| ConsentScope::from_action(&action)),
                action,
                purpose,
                risk,
                ttl_hours: ttl_hours.unwrap_or(console.config.consent.default_ttl_hours),
                session_id: console.config.api.session_id.clone(),
                rationale: Rationale::from_parts(why, how),
            };
            negotiate(console, request, preset_decision(approve, deny)).await
        }
    }
}

async fn negotiate(console: Console, request: ConsentRequest, preset: Option<ConsentDecision>) -> Result<()> {
    let orchestrator = console.orchestrator();
    let consent_id = orchestrator
        .request(request.clone())
        .await
        .context("Consent request failed")?;

    let prompt = TerminalPrompt::new(preset);
    let Some(decision) = prompt.ask(&request, &consent_id).await else {
        orchestrator.discard();
        println!("{}", "Dismissed; no decision recorded".dimmed());
        return Ok(());
    };

    orchestrator
        .decide(decision)
        .await
        .context("Failed to record consent decision")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: ConsentCommand,
    }

    #[test]
    fn test_request_arguments_parse() {
        let harness = Harness::try_parse_from([
            "aurora", "request", "--action", "files.delete", "--purpose", "cleanup", "--risk", "medium",
            "--ttl-hours", "24", "--approve",
        ])
        .unwrap();

        let ConsentCommand::Request {
            action,
            scope,
            risk,
            ttl_hours,
            approve,
            ..
        } = harness.command;
        assert_eq!(action, "files.delete");
        assert_eq!(scope, None);
        assert_eq!(risk, RiskLevel::Medium);
        assert_eq!(ttl_hours, Some(24));
        assert!(approve);
    }

    #[test]
    fn test_rationale_arguments_parse() {
        let harness = Harness::try_parse_from([
            "aurora", "request", "--action", "mail.send", "--purpose", "p", "--why", "user asked", "--how", "smtp",
        ])
        .unwrap();

        let ConsentCommand::Request { why, how, .. } = harness.command;
        assert_eq!(
            Rationale::from_parts(why, how),
            Some(Rationale {
                why: Some("user asked".to_string()),
                how: Some("smtp".to_string()),
            })
        );
    }

    #[test]
    fn test_approve_and_deny_conflict() {
        let result = Harness::try_parse_from([
            "aurora", "request", "--action", "mail.send", "--purpose", "p", "--approve", "--deny",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let result = Harness::try_parse_from([
            "aurora", "request", "--action", "mail.send", "--purpose", "p", "--scope", "calendar",
        ]);
        assert!(result.is_err());
    }
}
