// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consent Orchestrator - per-caller consent negotiation state machine
//!
//! Tracks one negotiation at a time: issue a consent request, wait for the
//! user's decision, record it. A newer request supersedes the pending one.
//!
//! Every call captures a liveness token (generation + cancellation token)
//! when it starts and re-checks it before mutating state, so a result that
//! arrives after the negotiation was discarded or superseded is dropped
//! without touching retained state or firing the listener.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::consent::{
    ConsentChannel, ConsentDecision, ConsentId, ConsentRecord, ConsentRequest, ConsentStatus,
};
use crate::domain::error::ConsoleError;
use crate::domain::execution::{AuthorizationChallenge, ConsentGrant};
use crate::application::execution_gateway::ChallengeResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Issuing,
    AwaitingDecision,
    Resolving,
    Resolved(ConsentDecision),
    Failed,
}

impl NegotiationState {
    fn in_flight(&self) -> bool {
        matches!(
            self,
            NegotiationState::Issuing | NegotiationState::AwaitingDecision | NegotiationState::Resolving
        )
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationState::Idle => f.write_str("Idle"),
            NegotiationState::Issuing => f.write_str("Issuing"),
            NegotiationState::AwaitingDecision => f.write_str("AwaitingDecision"),
            NegotiationState::Resolving => f.write_str("Resolving"),
            NegotiationState::Resolved(decision) => write!(f, "Resolved({})", decision),
            NegotiationState::Failed => f.write_str("Failed"),
        }
    }
}

/// Callbacks fired on live transitions only.
pub trait ConsentListener: Send + Sync {
    fn on_resolved(&self, consent_id: &ConsentId, decision: ConsentDecision);

    fn on_failed(&self, error: &ConsoleError);
}

/// Retry policy for issue calls that never reached the server.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: Duration::from_millis(250),
        }
    }
}

/// Read-only view of the current negotiation.
#[derive(Debug, Clone)]
pub struct NegotiationSnapshot {
    pub state: NegotiationState,
    pub request: Option<ConsentRequest>,
    pub consent_id: Option<ConsentId>,
    pub last_error: Option<ConsoleError>,
}

impl NegotiationSnapshot {
    /// Local view of the server record, once one has been issued.
    pub fn record(&self) -> Option<ConsentRecord> {
        let consent_id = self.consent_id.clone()?;
        let status = match self.state {
            NegotiationState::Resolved(decision) => ConsentStatus::from(decision),
            _ => ConsentStatus::Pending,
        };
        Some(ConsentRecord { consent_id, status })
    }
}

struct Negotiation {
    generation: u64,
    liveness: CancellationToken,
    state: NegotiationState,
    request: Option<ConsentRequest>,
    consent_id: Option<ConsentId>,
    last_error: Option<ConsoleError>,
}

impl Negotiation {
    fn idle() -> Self {
        Self {
            generation: 0,
            liveness: CancellationToken::new(),
            state: NegotiationState::Idle,
            request: None,
            consent_id: None,
            last_error: None,
        }
    }

    /// Invalidate every call started under the current generation.
    fn retire(&mut self) {
        self.liveness.cancel();
        self.generation += 1;
        self.liveness = CancellationToken::new();
    }

    fn capture(&self) -> Liveness {
        Liveness {
            generation: self.generation,
            token: self.liveness.clone(),
        }
    }

    fn is_live(&self, liveness: &Liveness) -> bool {
        self.generation == liveness.generation && !liveness.token.is_cancelled()
    }
}

struct Liveness {
    generation: u64,
    token: CancellationToken,
}

pub struct ConsentOrchestrator {
    channel: Arc<dyn ConsentChannel>,
    listener: Option<Arc<dyn ConsentListener>>,
    retry: RetryPolicy,
    negotiation: Mutex<Negotiation>,
}

impl ConsentOrchestrator {
    pub fn new(channel: Arc<dyn ConsentChannel>) -> Self {
        Self {
            channel,
            listener: None,
            retry: RetryPolicy::default(),
            negotiation: Mutex::new(Negotiation::idle()),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ConsentListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            attempts: retry.attempts.max(1),
            delay: retry.delay,
        };
        self
    }

    pub fn state(&self) -> NegotiationState {
        self.negotiation.lock().state.clone()
    }

    pub fn snapshot(&self) -> NegotiationSnapshot {
        let negotiation = self.negotiation.lock();
        NegotiationSnapshot {
            state: negotiation.state.clone(),
            request: negotiation.request.clone(),
            consent_id: negotiation.consent_id.clone(),
            last_error: negotiation.last_error.clone(),
        }
    }

    /// Start a negotiation: Idle/Resolved/Failed → Issuing → AwaitingDecision.
    ///
    /// A negotiation still in flight is superseded; its pending result is
    /// discarded when it arrives.
    pub async fn request(&self, request: ConsentRequest) -> Result<ConsentId, ConsoleError> {
        request.validate()?;

        let liveness = {
            let mut negotiation = self.negotiation.lock();
            if negotiation.state.in_flight() {
                info!(
                    previous = %negotiation.state,
                    consent_id = ?negotiation.consent_id,
                    "Superseding pending consent negotiation"
                );
            }
            negotiation.retire();
            negotiation.state = NegotiationState::Issuing;
            negotiation.request = Some(request.clone());
            negotiation.consent_id = None;
            negotiation.last_error = None;
            negotiation.capture()
        };

        let result = self.issue_with_retry(&request, &liveness).await;

        let mut negotiation = self.negotiation.lock();
        if !negotiation.is_live(&liveness) {
            debug!(action = %request.action, "Discarding stale issue result");
            return Err(ConsoleError::Superseded);
        }

        match result {
            Ok(consent_id) => {
                negotiation.state = NegotiationState::AwaitingDecision;
                negotiation.consent_id = Some(consent_id.clone());
                Ok(consent_id)
            }
            Err(e) => {
                negotiation.state = NegotiationState::Failed;
                negotiation.last_error = Some(e.clone());
                drop(negotiation);
                warn!(action = %request.action, error = %e, "Consent request failed");
                self.notify_failed(&e);
                Err(e)
            }
        }
    }

    pub async fn approve(&self) -> Result<ConsentDecision, ConsoleError> {
        self.decide(ConsentDecision::Approved).await
    }

    pub async fn deny(&self) -> Result<ConsentDecision, ConsoleError> {
        self.decide(ConsentDecision::Denied).await
    }

    /// AwaitingDecision → Resolving → Resolved | Failed.
    ///
    /// Also accepted from Failed while a consent id is retained, so a failed
    /// decision can be retried without re-issuing.
    pub async fn decide(&self, decision: ConsentDecision) -> Result<ConsentDecision, ConsoleError> {
        let (consent_id, liveness) = {
            let mut negotiation = self.negotiation.lock();
            let consent_id = match (&negotiation.state, &negotiation.consent_id) {
                (NegotiationState::AwaitingDecision, Some(id)) | (NegotiationState::Failed, Some(id)) => id.clone(),
                (state, _) => {
                    return Err(ConsoleError::InvalidState {
                        expected: "AwaitingDecision",
                        found: state.to_string(),
                    })
                }
            };
            negotiation.state = NegotiationState::Resolving;
            negotiation.last_error = None;
            (consent_id, negotiation.capture())
        };

        let result = tokio::select! {
            biased;
            _ = liveness.token.cancelled() => Err(ConsoleError::Superseded),
            result = self.channel.decide(&consent_id, decision) => result,
        };

        let mut negotiation = self.negotiation.lock();
        if !negotiation.is_live(&liveness) {
            debug!(consent_id = %consent_id, "Discarding stale decision result");
            return Err(ConsoleError::Superseded);
        }

        match result {
            Ok(_) => {
                negotiation.state = NegotiationState::Resolved(decision);
                drop(negotiation);
                info!(consent_id = %consent_id, decision = %decision, "Consent resolved");
                if let Some(listener) = &self.listener {
                    listener.on_resolved(&consent_id, decision);
                }
                Ok(decision)
            }
            Err(e) => {
                negotiation.state = NegotiationState::Failed;
                negotiation.last_error = Some(e.clone());
                drop(negotiation);
                warn!(consent_id = %consent_id, error = %e, "Consent decision failed");
                self.notify_failed(&e);
                Err(e)
            }
        }
    }

    /// Abandon the current negotiation (caller torn down or request changed).
    ///
    /// In-flight calls resolve to `Superseded` and leave no trace.
    pub fn discard(&self) {
        let mut negotiation = self.negotiation.lock();
        if negotiation.state.in_flight() {
            debug!(state = %negotiation.state, "Discarding consent negotiation");
        }
        negotiation.retire();
        negotiation.state = NegotiationState::Idle;
        negotiation.request = None;
        negotiation.consent_id = None;
        negotiation.last_error = None;
    }

    async fn issue_with_retry(
        &self,
        request: &ConsentRequest,
        liveness: &Liveness,
    ) -> Result<ConsentId, ConsoleError> {
        let mut attempt = 1;
        loop {
            let result = tokio::select! {
                biased;
                _ = liveness.token.cancelled() => return Err(ConsoleError::Superseded),
                result = self.channel.issue(request) => result,
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.retry.attempts => {
                    debug!(attempt, error = %e, "Retrying consent issue");
                    attempt += 1;
                    tokio::select! {
                        biased;
                        _ = liveness.token.cancelled() => return Err(ConsoleError::Superseded),
                        _ = tokio::time::sleep(self.retry.delay) => {}
                    }
                }
                other => return other,
            }
        }
    }

    fn notify_failed(&self, error: &ConsoleError) {
        if let Some(listener) = &self.listener {
            listener.on_failed(error);
        }
    }
}

/// Source of the user's answer to a consent request.
#[async_trait]
pub trait DecisionPrompt: Send + Sync {
    /// `None` when the user dismisses the request without deciding.
    async fn ask(&self, request: &ConsentRequest, consent_id: &ConsentId) -> Option<ConsentDecision>;
}

/// Resolves executor challenges by negotiating consent with the user.
pub struct PromptedChallengeResolver {
    orchestrator: Arc<ConsentOrchestrator>,
    prompt: Arc<dyn DecisionPrompt>,
    session_id: String,
    default_ttl_hours: u32,
}

impl PromptedChallengeResolver {
    pub fn new(
        orchestrator: Arc<ConsentOrchestrator>,
        prompt: Arc<dyn DecisionPrompt>,
        session_id: impl Into<String>,
        default_ttl_hours: u32,
    ) -> Self {
        Self {
            orchestrator,
            prompt,
            session_id: session_id.into(),
            default_ttl_hours,
        }
    }
}

#[async_trait]
impl ChallengeResolver for PromptedChallengeResolver {
    async fn resolve(&self, challenge: &AuthorizationChallenge) -> Result<ConsentGrant, ConsoleError> {
        let request = challenge.to_consent_request(&self.session_id, self.default_ttl_hours);
        let consent_id = self.orchestrator.request(request.clone()).await?;

        let decision = match self.prompt.ask(&request, &consent_id).await {
            Some(decision) => decision,
            None => {
                self.orchestrator.discard();
                return Err(ConsoleError::Superseded);
            }
        };

        let decision = self.orchestrator.decide(decision).await?;
        Ok(ConsentGrant {
            consent_id,
            decision,
            token: challenge.token.clone(),
        })
    }

    fn abandon(&self) {
        self.orchestrator.discard();
    }
}
