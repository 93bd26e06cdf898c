// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Execution Gateway
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Submit plans and route authorization challenges to consent
//! - **Integration:** CLI → this gateway → `ExecutorClient`; challenges → `ChallengeResolver`
//!
//! An execute call returns either a result or a challenge. A challenge
//! blocks the plan until a consent negotiation resolves it:
//!
//! - **approved:** the same plan is resubmitted once with the grant attached
//! - **denied:** the plan is abandoned and never resubmitted

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::consent::ConsentDecision;
use crate::domain::error::ConsoleError;
use crate::domain::execution::{
    AuthorizationChallenge, ConsentGrant, ExecuteRequest, ExecutionOutcome, ExecutionPlan, ExecutorClient,
    PlanOutcome,
};

/// Turns an authorization challenge into a consent decision.
#[async_trait]
pub trait ChallengeResolver: Send + Sync {
    async fn resolve(&self, challenge: &AuthorizationChallenge) -> Result<ConsentGrant, ConsoleError>;

    /// Called when a pending `resolve` is dropped because the run was
    /// cancelled. Any negotiation it started must not outlive the run.
    fn abandon(&self) {}
}

pub struct ExecutionGateway {
    client: Arc<dyn ExecutorClient>,
    session_id: String,
    max_rounds: u32,
}

impl ExecutionGateway {
    pub fn new(client: Arc<dyn ExecutorClient>, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            max_rounds: 4,
        }
    }

    /// Upper bound on distinct challenges resolved for one plan.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn plan(&self, input: &str, context: &Map<String, Value>) -> Result<ExecutionPlan, ConsoleError> {
        self.client.plan(input, context).await
    }

    /// Single execute call, optionally carrying a consent grant.
    pub async fn submit(
        &self,
        plan: &ExecutionPlan,
        grant: Option<&ConsentGrant>,
    ) -> Result<ExecutionOutcome, ConsoleError> {
        if plan.is_empty() {
            return Err(ConsoleError::InvalidRequest("plan has no steps".to_string()));
        }

        self.client
            .execute(ExecuteRequest {
                plan,
                session_id: &self.session_id,
                consent_id: grant.map(|g| &g.consent_id),
                consent_token: grant.and_then(|g| g.token.as_deref()),
            })
            .await
    }

    /// Run a plan to completion, resolving challenges as they come.
    ///
    /// Returns `Superseded` when `cancel` fires; any late executor or
    /// consent result is then dropped.
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        resolver: &dyn ChallengeResolver,
        cancel: &CancellationToken,
    ) -> Result<PlanOutcome, ConsoleError> {
        let mut grant: Option<ConsentGrant> = None;
        let mut resolved: Option<AuthorizationChallenge> = None;
        let mut rounds = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConsoleError::Superseded),
                outcome = self.submit(plan, grant.as_ref()) => outcome?,
            };

            let challenge = match outcome {
                ExecutionOutcome::Success(result) => {
                    info!(intent = %plan.intent, steps = result.len(), "Plan executed");
                    return Ok(PlanOutcome::Completed(result));
                }
                ExecutionOutcome::ChallengeRequired(challenge) => challenge,
            };

            if resolved.as_ref() == Some(&challenge) {
                warn!(action = %challenge.action, "Executor repeated an approved challenge");
                return Err(ConsoleError::UnresolvedChallenge {
                    action: challenge.action,
                });
            }

            rounds += 1;
            if rounds > self.max_rounds {
                warn!(action = %challenge.action, rounds, "Too many consent challenges for one plan");
                return Err(ConsoleError::UnresolvedChallenge {
                    action: challenge.action,
                });
            }

            info!(action = %challenge.action, round = rounds, "Plan blocked on consent");
            let decision = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    resolver.abandon();
                    return Err(ConsoleError::Superseded);
                }
                decision = resolver.resolve(&challenge) => decision?,
            };

            match decision.decision {
                ConsentDecision::Denied => {
                    info!(action = %challenge.action, "Consent denied; plan abandoned");
                    return Ok(PlanOutcome::Denied(challenge));
                }
                ConsentDecision::Approved => {
                    grant = Some(decision);
                    resolved = Some(challenge);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::consent::ConsentId;
    use crate::domain::execution::{PlanStep, StepResult};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    struct Submission {
        consent_id: Option<String>,
        consent_token: Option<String>,
    }

    /// Executor replaying a scripted sequence of outcomes.
    struct ScriptedExecutor {
        outcomes: Mutex<VecDeque<ExecutionOutcome>>,
        submissions: Mutex<Vec<Submission>>,
    }

    impl ScriptedExecutor {
        fn new(outcomes: Vec<ExecutionOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                submissions: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExecutorClient for ScriptedExecutor {
        async fn plan(&self, input: &str, _context: &Map<String, Value>) -> Result<ExecutionPlan, ConsoleError> {
            Ok(ExecutionPlan::new(input, vec![PlanStep::new("nlp", "summarize")]))
        }

        async fn execute(&self, request: ExecuteRequest<'_>) -> Result<ExecutionOutcome, ConsoleError> {
            self.submissions.lock().push(Submission {
                consent_id: request.consent_id.map(|id| id.to_string()),
                consent_token: request.consent_token.map(str::to_string),
            });
            self.outcomes
                .lock()
                .pop_front()
                .ok_or_else(|| ConsoleError::Parse("script exhausted".to_string()))
        }
    }

    struct FixedResolver {
        decision: ConsentDecision,
        calls: Mutex<Vec<AuthorizationChallenge>>,
    }

    impl FixedResolver {
        fn new(decision: ConsentDecision) -> Self {
            Self {
                decision,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChallengeResolver for FixedResolver {
        async fn resolve(&self, challenge: &AuthorizationChallenge) -> Result<ConsentGrant, ConsoleError> {
            let mut calls = self.calls.lock();
            calls.push(challenge.clone());
            Ok(ConsentGrant {
                consent_id: ConsentId::new(format!("c-{}", calls.len())),
                decision: self.decision,
                token: challenge.token.clone(),
            })
        }
    }

    /// Resolver that never answers, recording whether it was abandoned.
    #[derive(Default)]
    struct StalledResolver {
        started: tokio::sync::Notify,
        abandoned: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ChallengeResolver for StalledResolver {
        async fn resolve(&self, _challenge: &AuthorizationChallenge) -> Result<ConsentGrant, ConsoleError> {
            self.started.notify_one();
            std::future::pending().await
        }

        fn abandon(&self) {
            self.abandoned.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn plan() -> ExecutionPlan {
        ExecutionPlan::new("send summary", vec![PlanStep::new("mail", "send")])
    }

    fn success() -> ExecutionOutcome {
        ExecutionOutcome::Success(vec![StepResult {
            step: "mail.send".to_string(),
            out: json!({"sent": true}),
        }])
    }

    fn challenge(action: &str, token: &str) -> ExecutionOutcome {
        ExecutionOutcome::ChallengeRequired(AuthorizationChallenge::new(action, "send summary").with_token(token))
    }

    #[tokio::test]
    async fn test_success_without_challenge() {
        let executor = ScriptedExecutor::new(vec![success()]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1");
        let resolver = FixedResolver::new(ConsentDecision::Approved);

        let outcome = gateway.run(&plan(), &resolver, &CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, PlanOutcome::Completed(ref r) if r.len() == 1));
        assert!(resolver.calls.lock().is_empty());
        assert_eq!(executor.submissions.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_approval_resubmits_once_with_grant() {
        let executor = ScriptedExecutor::new(vec![challenge("mail.send", "t-1"), success()]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1");
        let resolver = FixedResolver::new(ConsentDecision::Approved);

        let outcome = gateway.run(&plan(), &resolver, &CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, PlanOutcome::Completed(_)));

        let submissions = executor.submissions.lock();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].consent_id, None);
        assert_eq!(
            submissions[1],
            Submission {
                consent_id: Some("c-1".to_string()),
                consent_token: Some("t-1".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_denial_never_resubmits() {
        let executor = ScriptedExecutor::new(vec![challenge("files.delete", "t-9"), success()]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1");
        let resolver = FixedResolver::new(ConsentDecision::Denied);

        let outcome = gateway.run(&plan(), &resolver, &CancellationToken::new()).await.unwrap();
        match outcome {
            PlanOutcome::Denied(challenge) => assert_eq!(challenge.action, "files.delete"),
            other => panic!("Expected denial, got {:?}", other),
        }
        assert_eq!(executor.submissions.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_challenge_after_approval_fails() {
        let executor = ScriptedExecutor::new(vec![challenge("mail.send", "t-1"), challenge("mail.send", "t-1")]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1");
        let resolver = FixedResolver::new(ConsentDecision::Approved);

        let err = gateway
            .run(&plan(), &resolver, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::UnresolvedChallenge { ref action } if action == "mail.send"));
        assert_eq!(resolver.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_chained_challenges_are_bounded() {
        let executor = ScriptedExecutor::new(vec![
            challenge("mail.send", "t-1"),
            challenge("files.write", "t-2"),
            challenge("system.exec", "t-3"),
        ]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1").with_max_rounds(2);
        let resolver = FixedResolver::new(ConsentDecision::Approved);

        let err = gateway
            .run(&plan(), &resolver, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::UnresolvedChallenge { .. }));
        assert_eq!(resolver.calls.lock().len(), 2);
        assert_eq!(executor.submissions.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_plan_is_rejected_locally() {
        let executor = ScriptedExecutor::new(vec![]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1");

        let err = gateway
            .submit(&ExecutionPlan::new("nothing", vec![]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidRequest(_)));
        assert!(executor.submissions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_is_superseded() {
        let executor = ScriptedExecutor::new(vec![success()]);
        let gateway = ExecutionGateway::new(executor, "sess-1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gateway
            .run(&plan(), &FixedResolver::new(ConsentDecision::Approved), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_silent());
    }

    #[tokio::test]
    async fn test_cancel_during_consent_abandons_resolver() {
        let executor = ScriptedExecutor::new(vec![challenge("mail.send", "t-1")]);
        let gateway = ExecutionGateway::new(executor.clone(), "sess-1");
        let resolver = StalledResolver::default();
        let cancel = CancellationToken::new();
        let mail = plan();

        let run = gateway.run(&mail, &resolver, &cancel);
        let trigger = async {
            resolver.started.notified().await;
            cancel.cancel();
        };
        let (result, _) = tokio::join!(run, trigger);

        assert!(matches!(result, Err(ConsoleError::Superseded)));
        assert!(resolver.abandoned.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(executor.submissions.lock().len(), 1);
    }
}
