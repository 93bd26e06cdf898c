// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consent Channel over HTTP
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** `POST {prefix}/request` and `POST {prefix}/decision`
//! - **Integration:** Consent Orchestrator → this channel → consent service
//!
//! Each call is a single attempt. Nothing is cached between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::consent::{ConsentChannel, ConsentDecision, ConsentId, ConsentRequest, ConsentStatus};
use crate::domain::error::ConsoleError;
use crate::infrastructure::api_client::AuroraApi;

pub struct HttpConsentChannel {
    api: AuroraApi,
    prefix: String,
}

impl HttpConsentChannel {
    pub fn new(api: AuroraApi, prefix: impl Into<String>) -> Self {
        Self {
            api,
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    fn path(&self, leaf: &str) -> String {
        format!("{}/{}", self.prefix, leaf)
    }
}

#[derive(Deserialize)]
struct IssueResponse {
    consent_id: ConsentId,
}

#[derive(Serialize)]
struct DecisionBody<'a> {
    consent_id: &'a ConsentId,
    decision: ConsentDecision,
}

#[derive(Deserialize)]
struct DecisionResponse {
    status: ConsentStatus,
}

#[async_trait]
impl ConsentChannel for HttpConsentChannel {
    async fn issue(&self, request: &ConsentRequest) -> Result<ConsentId, ConsoleError> {
        let response: IssueResponse = self.api.post_json(&self.path("request"), request).await?;

        info!(
            consent_id = %response.consent_id,
            action = %request.action,
            risk = %request.risk,
            "Consent requested"
        );

        Ok(response.consent_id)
    }

    async fn decide(
        &self,
        consent_id: &ConsentId,
        decision: ConsentDecision,
    ) -> Result<ConsentStatus, ConsoleError> {
        let body = DecisionBody { consent_id, decision };
        let response: DecisionResponse = self.api.post_json(&self.path("decision"), &body).await?;

        if response.status != ConsentStatus::from(decision) {
            return Err(ConsoleError::DecisionMismatch {
                requested: decision.to_string(),
                returned: response.status.to_string(),
            });
        }

        debug!(consent_id = %consent_id, status = %response.status, "Consent decision recorded");
        Ok(response.status)
    }
}
