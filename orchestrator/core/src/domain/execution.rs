// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::consent::{ConsentDecision, ConsentId, ConsentRequest, ConsentScope, Rationale, RiskLevel};
use crate::domain::error::ConsoleError;

/// One tool invocation of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: String,
    pub op: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl PlanStep {
    pub fn new(tool: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            op: op.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Action name as used by the consent protocol, e.g. `mail.send`.
    pub fn action(&self) -> String {
        format!("{}.{}", self.tool, self.op)
    }
}

/// Ordered steps produced by the planning call and consumed once by the
/// Execution Gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub intent: String,
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn new(intent: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            intent: intent.into(),
            steps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Output of a single executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    #[serde(default)]
    pub out: Value,
}

pub type ExecutionResult = Vec<StepResult>;

/// Returned by the executor instead of a result when a step needs consent
/// that is not yet on file.
///
/// `token` correlates the challenge to a plan step; it is not a consent id
/// and must be exchanged through the consent protocol first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationChallenge {
    pub action: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<Rationale>,
}

impl AuthorizationChallenge {
    pub fn new(action: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            purpose: purpose.into(),
            token: None,
            scope: None,
            risk: None,
            ttl_hours: None,
            session_id: None,
            rationale: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the consent request the user is asked to approve.
    ///
    /// Missing scope is derived from the action prefix, missing risk is
    /// treated as high and missing ttl falls back to `default_ttl_hours`.
    pub fn to_consent_request(&self, session_id: &str, default_ttl_hours: u32) -> ConsentRequest {
        let scope = self
            .scope
            .as_deref()
            .and_then(|s| s.parse::<ConsentScope>().ok())
            .unwrap_or_else(|| ConsentScope::from_action(&self.action));

        let purpose = if self.purpose.trim().is_empty() {
            format!("Execute {}", self.action)
        } else {
            self.purpose.clone()
        };

        ConsentRequest {
            action: self.action.clone(),
            purpose,
            scope,
            risk: self.risk.unwrap_or(RiskLevel::High),
            ttl_hours: self.ttl_hours.unwrap_or(default_ttl_hours),
            session_id: self
                .session_id
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| session_id.to_string()),
            rationale: self.rationale.clone().filter(|r| !r.is_empty()),
        }
    }
}

/// Result of one execute call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success(ExecutionResult),
    ChallengeRequired(AuthorizationChallenge),
}

/// Terminal state of a plan driven through the Execution Gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Completed(ExecutionResult),
    /// The user refused a challenge; the plan is never resubmitted.
    Denied(AuthorizationChallenge),
}

/// Body of `POST /aurora/execute`.
///
/// `consent_id` and `consent_token` are only set on a resubmission that
/// follows an approved challenge.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub plan: &'a ExecutionPlan,
    pub session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_id: Option<&'a ConsentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_token: Option<&'a str>,
}

/// Consent granted for a challenge, carried into the resubmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentGrant {
    pub consent_id: ConsentId,
    pub decision: ConsentDecision,
    pub token: Option<String>,
}

/// Remote planner and executor.
#[async_trait]
pub trait ExecutorClient: Send + Sync {
    async fn plan(&self, input: &str, context: &Map<String, Value>) -> Result<ExecutionPlan, ConsoleError>;

    async fn execute(&self, request: ExecuteRequest<'_>) -> Result<ExecutionOutcome, ConsoleError>;
}
