// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consent domain types and the channel contract used to negotiate them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Consent requests, records and decisions shared by the
//!   Consent Channel and the Consent Orchestrator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::ConsoleError;

/// Upper bound accepted by the consent service for `ttl_hours` (one week).
pub const MAX_TTL_HOURS: u32 = 168;

/// Server-issued identifier of a consent record. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentId(pub String);

impl ConsentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentScope {
    Mail,
    Files,
    System,
    Browser,
    Nlp,
    Ocr,
}

impl ConsentScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentScope::Mail => "mail",
            ConsentScope::Files => "files",
            ConsentScope::System => "system",
            ConsentScope::Browser => "browser",
            ConsentScope::Nlp => "nlp",
            ConsentScope::Ocr => "ocr",
        }
    }

    /// Derive the scope from an action name such as `mail.send`.
    ///
    /// Unknown prefixes map to `System`, the broadest scope.
    pub fn from_action(action: &str) -> Self {
        let prefix = action.split('.').next().unwrap_or_default();
        match prefix {
            "mail" => ConsentScope::Mail,
            "files" => ConsentScope::Files,
            "browser" => ConsentScope::Browser,
            "nlp" => ConsentScope::Nlp,
            "ocr" | "screen" => ConsentScope::Ocr,
            _ => ConsentScope::System,
        }
    }
}

impl std::str::FromStr for ConsentScope {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mail" => Ok(ConsentScope::Mail),
            "files" => Ok(ConsentScope::Files),
            "system" => Ok(ConsentScope::System),
            "browser" => Ok(ConsentScope::Browser),
            "nlp" => Ok(ConsentScope::Nlp),
            "ocr" => Ok(ConsentScope::Ocr),
            other => Err(ConsoleError::InvalidRequest(format!(
                "unknown scope '{}'. Expected mail|files|system|browser|nlp|ocr",
                other
            ))),
        }
    }
}

impl fmt::Display for ConsentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(ConsoleError::InvalidRequest(format!(
                "unknown risk level '{}'. Expected low|medium|high",
                other
            ))),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an action is wanted and how it will be carried out, shown to the
/// user next to the consent prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how: Option<String>,
}

impl Rationale {
    /// `None` when both parts are missing or blank.
    pub fn from_parts(why: Option<String>, how: Option<String>) -> Option<Self> {
        let keep = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        let rationale = Self {
            why: keep(why),
            how: keep(how),
        };
        (!rationale.is_empty()).then_some(rationale)
    }

    pub fn is_empty(&self) -> bool {
        self.why.is_none() && self.how.is_none()
    }
}

/// A request for explicit user consent, created when a risky action is
/// identified. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub action: String,
    pub purpose: String,
    pub scope: ConsentScope,
    pub risk: RiskLevel,
    /// Validity in hours; 0 means single-use.
    pub ttl_hours: u32,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<Rationale>,
}

impl ConsentRequest {
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if self.action.trim().is_empty() {
            return Err(ConsoleError::InvalidRequest("action cannot be empty".into()));
        }
        if self.session_id.trim().is_empty() {
            return Err(ConsoleError::InvalidRequest("session_id cannot be empty".into()));
        }
        if self.ttl_hours > MAX_TTL_HOURS {
            return Err(ConsoleError::InvalidRequest(format!(
                "ttl_hours {} exceeds the maximum of {}",
                self.ttl_hours, MAX_TTL_HOURS
            )));
        }
        Ok(())
    }

    pub fn is_single_use(&self) -> bool {
        self.ttl_hours == 0
    }
}

/// The user's answer to a consent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    Approved,
    Denied,
}

impl ConsentDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentDecision::Approved => "approved",
            ConsentDecision::Denied => "denied",
        }
    }
}

impl fmt::Display for ConsentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side lifecycle of a consent record.
///
/// The client only observes `Pending` and the decided states; `Expired` is
/// inferred when a decision against the record is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Pending => "pending",
            ConsentStatus::Approved => "approved",
            ConsentStatus::Denied => "denied",
            ConsentStatus::Expired => "expired",
        }
    }
}

impl From<ConsentDecision> for ConsentStatus {
    fn from(decision: ConsentDecision) -> Self {
        match decision {
            ConsentDecision::Approved => ConsentStatus::Approved,
            ConsentDecision::Denied => ConsentStatus::Denied,
        }
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side projection of the server's consent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub consent_id: ConsentId,
    pub status: ConsentStatus,
}

/// The two calls of the consent protocol.
///
/// Implementations make exactly one attempt per call. Retry policy belongs
/// to the orchestrator.
#[async_trait]
pub trait ConsentChannel: Send + Sync {
    /// Issue a consent request and return the server-assigned id.
    async fn issue(&self, request: &ConsentRequest) -> Result<ConsentId, ConsoleError>;

    /// Record a decision. On success the returned status equals `decision`.
    async fn decide(
        &self,
        consent_id: &ConsentId,
        decision: ConsentDecision,
    ) -> Result<ConsentStatus, ConsoleError>;
}
