// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for `/aurora/plan` and `/aurora/execute`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::error::ConsoleError;
use crate::domain::execution::{
    AuthorizationChallenge, ExecuteRequest, ExecutionOutcome, ExecutionPlan, ExecutorClient, StepResult,
};
use crate::infrastructure::api_client::AuroraApi;

const PLAN_PATH: &str = "/aurora/plan";
const EXECUTE_PATH: &str = "/aurora/execute";

pub struct HttpExecutorClient {
    api: AuroraApi,
}

impl HttpExecutorClient {
    pub fn new(api: AuroraApi) -> Self {
        Self { api }
    }
}

#[derive(Serialize)]
struct PlanBody<'a> {
    input: &'a str,
    context: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct PlanResponse {
    plan: ExecutionPlan,
}

/// The executor distinguishes a result from a challenge only by which
/// field is present; this is decoded once here into `ExecutionOutcome`.
#[derive(Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    requires_consent: Option<AuthorizationChallenge>,
    #[serde(default)]
    result: Option<Vec<StepResult>>,
}

impl ExecuteResponse {
    fn into_outcome(self) -> Result<ExecutionOutcome, ConsoleError> {
        match (self.requires_consent, self.result) {
            (Some(challenge), _) => Ok(ExecutionOutcome::ChallengeRequired(challenge)),
            (None, Some(result)) => Ok(ExecutionOutcome::Success(result)),
            (None, None) => Err(ConsoleError::decode(
                EXECUTE_PATH,
                "response carries neither 'result' nor 'requires_consent'",
            )),
        }
    }
}

#[async_trait]
impl ExecutorClient for HttpExecutorClient {
    async fn plan(&self, input: &str, context: &Map<String, Value>) -> Result<ExecutionPlan, ConsoleError> {
        let response: PlanResponse = self.api.post_json(PLAN_PATH, &PlanBody { input, context }).await?;
        debug!(steps = response.plan.steps.len(), "Plan received");
        Ok(response.plan)
    }

    async fn execute(&self, request: ExecuteRequest<'_>) -> Result<ExecutionOutcome, ConsoleError> {
        let response: ExecuteResponse = self.api.post_json(EXECUTE_PATH, &request).await?;
        let outcome = response.into_outcome()?;

        if let ExecutionOutcome::ChallengeRequired(challenge) = &outcome {
            info!(action = %challenge.action, token = ?challenge.token, "Executor requires consent");
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::PlanStep;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> HttpExecutorClient {
        HttpExecutorClient::new(AuroraApi::new(server.url()).unwrap())
    }

    #[tokio::test]
    async fn test_plan_request() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/aurora/plan")
            .match_body(Matcher::Json(json!({"input": "send the summary", "context": {}})))
            .with_body(
                json!({"plan": {"intent": "send the summary", "steps": [
                    {"tool": "mail", "op": "send", "args": {"subject": "send the summary"}}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;

        let plan = client(&server).plan("send the summary", &Map::new()).await.unwrap();
        assert_eq!(plan.intent, "send the summary");
        assert_eq!(plan.steps[0].action(), "mail.send");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/aurora/execute")
            .match_body(Matcher::PartialJson(json!({"session_id": "sess-1"})))
            .with_body(r#"{"status":"ok","result":[{"step":"calendar.create","out":{"ok":true}}]}"#)
            .create_async()
            .await;

        let plan = ExecutionPlan::new("schedule", vec![PlanStep::new("calendar", "create")]);
        let outcome = client(&server)
            .execute(ExecuteRequest {
                plan: &plan,
                session_id: "sess-1",
                consent_id: None,
                consent_token: None,
            })
            .await
            .unwrap();

        match outcome {
            ExecutionOutcome::Success(result) => {
                assert_eq!(result.len(), 1);
                assert_eq!(result[0].step, "calendar.create");
                assert_eq!(result[0].out["ok"], true);
            }
            other => panic!("Expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_challenge() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/aurora/execute")
            .with_body(r#"{"requires_consent":{"action":"mail.send","purpose":"send summary","token":"t-1"}}"#)
            .create_async()
            .await;

        let plan = ExecutionPlan::new("mail", vec![PlanStep::new("mail", "send")]);
        let outcome = client(&server)
            .execute(ExecuteRequest {
                plan: &plan,
                session_id: "sess-1",
                consent_id: None,
                consent_token: None,
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ExecutionOutcome::ChallengeRequired(
                AuthorizationChallenge::new("mail.send", "send summary").with_token("t-1")
            )
        );
    }

    #[tokio::test]
    async fn test_execute_unrecognized_shape() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/aurora/execute")
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let plan = ExecutionPlan::new("x", vec![PlanStep::new("nlp", "summarize")]);
        let err = client(&server)
            .execute(ExecuteRequest {
                plan: &plan,
                session_id: "s",
                consent_id: None,
                consent_token: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Decode { .. }));
    }
}
