// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event Ingest - subscribes to the push channel and feeds the aggregator

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::aggregation::AggregationEngine;
use crate::domain::error::ConsoleError;
use crate::domain::events::{EventEnvelope, EventSource};

/// How often expired notifications are swept while the feed is quiet.
const SWEEP_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub delivered: u64,
    pub dropped: u64,
}

pub struct EventIngest {
    source: Arc<dyn EventSource>,
}

impl EventIngest {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Deliver envelopes to `engine` in arrival order until the stream ends
    /// or `cancel` fires.
    ///
    /// Malformed payloads are dropped. Only the initial subscription can
    /// fail; resubscription is the source's concern.
    pub async fn run(
        &self,
        engine: &mut AggregationEngine,
        cancel: CancellationToken,
    ) -> Result<IngestStats, ConsoleError> {
        let mut messages = self.source.subscribe().await?;
        let mut stats = IngestStats::default();
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Event ingest cancelled");
                    break;
                }
                _ = sweep.tick() => engine.expire(Instant::now()),
                message = messages.next() => match message {
                    Some(payload) => match serde_json::from_str::<EventEnvelope>(&payload) {
                        Ok(envelope) => {
                            engine.ingest(&envelope, Instant::now());
                            stats.delivered += 1;
                        }
                        Err(e) => {
                            debug!(error = %e, "Dropping malformed event");
                            stats.dropped += 1;
                        }
                    },
                    None => {
                        info!("Event stream ended");
                        break;
                    }
                },
            }
        }

        Ok(stats)
    }
}
