// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal wiring for the console services
//!
//! Builds the core services from a `ConsoleConfig` and provides the
//! terminal-facing adapters: the consent prompt, the consent listener and
//! the notification sink that renders aggregated events.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use dialoguer::Select;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use aurora_console_core::application::{
    AggregationEngine, ConsentListener, ConsentOrchestrator, DecisionPrompt, EventIngest, ExecutionGateway,
    PromptedChallengeResolver, RetryPolicy,
};
use aurora_console_core::consent::{ConsentDecision, ConsentId, ConsentRequest};
use aurora_console_core::console_config::ConsoleConfig;
use aurora_console_core::error::ConsoleError;
use aurora_console_core::events::{Notification, NotificationHandle, NotificationSink, NotificationTone};
use aurora_console_core::infrastructure::{AuroraApi, HttpConsentChannel, HttpEventSource, HttpExecutorClient};
use tokio_util::sync::CancellationToken;

/// Overrides taken from global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOverrides {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub session_id: Option<String>,
}

/// Load configuration, apply flag overrides and validate.
pub fn load_config(overrides: &ConsoleOverrides) -> Result<ConsoleConfig> {
    let mut config =
        ConsoleConfig::load_or_default(overrides.config_path.clone()).context("Failed to load configuration")?;

    if let Some(url) = &overrides.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(session_id) = &overrides.session_id {
        config.api.session_id = session_id.clone();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Core services bound to one Aurora endpoint.
pub struct Console {
    pub config: ConsoleConfig,
    api: AuroraApi,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        let api = AuroraApi::new(config.api.base_url.clone()).context("Failed to create HTTP client")?;
        Ok(Self { config, api })
    }

    pub fn gateway(&self) -> ExecutionGateway {
        ExecutionGateway::new(
            Arc::new(HttpExecutorClient::new(self.api.clone())),
            self.config.api.session_id.clone(),
        )
        .with_max_rounds(self.config.consent.max_rounds)
    }

    pub fn orchestrator(&self) -> Arc<ConsentOrchestrator> {
        let channel = HttpConsentChannel::new(self.api.clone(), self.config.api.consent_prefix.clone());
        Arc::new(
            ConsentOrchestrator::new(Arc::new(channel))
                .with_listener(Arc::new(TerminalListener::stdout()))
                .with_retry(RetryPolicy {
                    attempts: self.config.consent.issue_attempts,
                    delay: self.config.consent.retry_delay(),
                }),
        )
    }

    pub fn resolver(
        &self,
        orchestrator: Arc<ConsentOrchestrator>,
        preset: Option<ConsentDecision>,
    ) -> PromptedChallengeResolver {
        PromptedChallengeResolver::new(
            orchestrator,
            Arc::new(TerminalPrompt::new(preset)),
            self.config.api.session_id.clone(),
            self.config.consent.default_ttl_hours,
        )
    }

    pub fn event_ingest(&self, cancel: CancellationToken) -> EventIngest {
        let source = HttpEventSource::new(
            self.api.clone(),
            self.config.events.stream_path.clone(),
            self.config.events.reconnect_delay(),
        )
        .with_cancellation(cancel);
        EventIngest::new(Arc::new(source))
    }

    pub fn aggregation_engine(&self) -> AggregationEngine {
        AggregationEngine::new(&self.config.events, Box::new(TerminalSink::stdout()))
    }
}

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

/// Asks the user to approve or deny, unless a decision was given up front.
pub struct TerminalPrompt {
    preset: Option<ConsentDecision>,
}

impl TerminalPrompt {
    pub fn new(preset: Option<ConsentDecision>) -> Self {
        Self { preset }
    }
}

pub fn print_consent_request(request: &ConsentRequest, consent_id: &ConsentId) {
    if let Err(e) = write_consent_request(&mut std::io::stdout(), request, consent_id) {
        warn!(error = %e, "Failed to print consent request");
    }
}

fn write_consent_request<W: Write>(
    out: &mut W,
    request: &ConsentRequest,
    consent_id: &ConsentId,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "Consent required".bold().yellow())?;
    writeln!(out, "  Action:  {}", request.action.bold())?;
    writeln!(out, "  Purpose: {}", request.purpose)?;
    if let Some(rationale) = &request.rationale {
        if let Some(why) = &rationale.why {
            writeln!(out, "  Why:     {}", why)?;
        }
        if let Some(how) = &rationale.how {
            writeln!(out, "  How:     {}", how.dimmed())?;
        }
    }
    writeln!(out, "  Scope:   {}", request.scope)?;
    writeln!(out, "  Risk:    {}", risk_label(&request.risk.to_string()))?;
    if request.is_single_use() {
        writeln!(out, "  TTL:     {}", "single use".dimmed())?;
    } else {
        writeln!(out, "  TTL:     {}h", request.ttl_hours)?;
    }
    writeln!(out, "  ID:      {}", consent_id.as_str().dimmed())
}

fn risk_label(risk: &str) -> colored::ColoredString {
    match risk {
        "high" => risk.red().bold(),
        "medium" => risk.yellow(),
        _ => risk.green(),
    }
}

#[async_trait]
impl DecisionPrompt for TerminalPrompt {
    async fn ask(&self, request: &ConsentRequest, consent_id: &ConsentId) -> Option<ConsentDecision> {
        print_consent_request(request, consent_id);

        if let Some(decision) = self.preset {
            println!("  Decision: {} {}", decision.as_str().bold(), "(preset)".dimmed());
            return Some(decision);
        }

        let answer = tokio::task::spawn_blocking(|| {
            Select::new()
                .with_prompt("Allow this action?")
                .items(&["Approve", "Deny", "Dismiss"])
                .default(1)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(0)) => Some(ConsentDecision::Approved),
            Ok(Ok(1)) => Some(ConsentDecision::Denied),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "Consent prompt unavailable");
                None
            }
            Err(e) => {
                warn!(error = %e, "Consent prompt aborted");
                None
            }
        }
    }
}

/// Prints consent outcomes as they are recorded.
///
/// Failures are only logged: the command that drove the negotiation
/// receives the same error and reports it.
pub struct TerminalListener<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl TerminalListener<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalListener<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ConsentListener for TerminalListener<W> {
    fn on_resolved(&self, consent_id: &ConsentId, decision: ConsentDecision) {
        let mark = match decision {
            ConsentDecision::Approved => "✓".green(),
            ConsentDecision::Denied => "✗".red(),
        };
        if let Err(e) = writeln!(self.out.lock(), "{} Consent {} {}", mark, consent_id, decision) {
            warn!(error = %e, "Failed to write consent outcome");
        }
    }

    fn on_failed(&self, error: &ConsoleError) {
        debug!(error = %error, "Consent negotiation failed");
    }
}

/// Renders aggregated notifications as terminal lines.
///
/// A terminal cannot redraw earlier output, so updates are printed as new
/// lines keyed by the notification handle. Expiry is only logged.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    next: u64,
    titles: HashMap<NotificationHandle, String>,
}

impl TerminalSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            next: 0,
            titles: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, marker: &str, handle: NotificationHandle, notification: &Notification) {
        let title = match notification.tone {
            NotificationTone::Ok => notification.title.green(),
            NotificationTone::Warning => notification.title.yellow(),
            NotificationTone::Error => notification.title.red().bold(),
        };
        let line = format!(
            "{} {} {} {}  {}",
            chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
            marker,
            handle,
            title,
            notification.description
        );
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!(error = %e, "Failed to write notification");
        }
    }
}

impl<W: Write + Send> NotificationSink for TerminalSink<W> {
    fn show(&mut self, notification: &Notification) -> NotificationHandle {
        self.next += 1;
        let handle = NotificationHandle(self.next);
        self.titles.insert(handle, notification.title.clone());
        self.render("+", handle, notification);
        handle
    }

    fn update(&mut self, handle: NotificationHandle, notification: &Notification) {
        self.render("~", handle, notification);
    }

    fn dismiss(&mut self, handle: NotificationHandle) {
        if let Some(title) = self.titles.remove(&handle) {
            tracing::debug!(handle = %handle, title = %title, "Notification expired");
        }
    }
}
