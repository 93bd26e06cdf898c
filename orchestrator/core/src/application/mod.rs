// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod aggregation;
pub mod consent_orchestrator;
pub mod event_ingest;
pub mod execution_gateway;

pub use aggregation::{AggregationEngine, AggregationEntry, IngestEffect};
pub use consent_orchestrator::{
    ConsentListener, ConsentOrchestrator, DecisionPrompt, NegotiationSnapshot, NegotiationState,
    PromptedChallengeResolver, RetryPolicy,
};
pub use event_ingest::{EventIngest, IngestStats};
pub use execution_gateway::{ChallengeResolver, ExecutionGateway};
