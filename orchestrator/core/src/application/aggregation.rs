// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Aggregation Engine
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Collapse bursts of equivalent events into one live notification
//! - **Integration:** Event Ingest → this engine → `NotificationSink`
//!
//! Events with the same `type|tool|outcome` key that arrive within the
//! aggregation window of the previous one update a single notification with
//! an occurrence count. A notification stays on display for a fixed
//! lifetime counted from when it was first shown.
//!
//! The engine is single-writer: Event Ingest owns it and feeds it in
//! arrival order. Time is passed in explicitly.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::console_config::EventsConfig;
use crate::domain::events::{AggregationKey, EventEnvelope, Notification, NotificationHandle, NotificationSink};

/// Aggregation state for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationEntry {
    pub handle: NotificationHandle,
    pub count: u32,
    pub last_seen: Instant,
}

/// What `ingest` did with an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEffect {
    /// A new notification was shown.
    Created { handle: NotificationHandle },
    /// An existing entry was counted. `visible` is false when its
    /// notification already expired and nothing was redrawn.
    Updated {
        handle: NotificationHandle,
        count: u32,
        visible: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct LiveNotification {
    handle: NotificationHandle,
    expires_at: Instant,
}

pub struct AggregationEngine {
    window: Duration,
    display_lifetime: Duration,
    max_visible: usize,
    entries: HashMap<AggregationKey, AggregationEntry>,
    // Ordered by expiry; every notification has the same lifetime.
    live: VecDeque<LiveNotification>,
    sink: Box<dyn NotificationSink>,
}

impl AggregationEngine {
    pub fn new(config: &EventsConfig, sink: Box<dyn NotificationSink>) -> Self {
        Self {
            window: config.window(),
            display_lifetime: config.display_lifetime(),
            max_visible: config.max_visible.max(1),
            entries: HashMap::new(),
            live: VecDeque::new(),
            sink,
        }
    }

    pub fn ingest(&mut self, envelope: &EventEnvelope, now: Instant) -> IngestEffect {
        self.expire(now);

        let key = envelope.aggregation_key();
        if let Some(entry) = self.entries.get_mut(&key) {
            if now.saturating_duration_since(entry.last_seen) < self.window {
                entry.count += 1;
                entry.last_seen = now;

                let visible = self.live.iter().any(|n| n.handle == entry.handle);
                if visible {
                    self.sink
                        .update(entry.handle, &Notification::from_envelope(envelope, entry.count));
                }
                debug!(key = %key, count = entry.count, visible, "Aggregated event");

                return IngestEffect::Updated {
                    handle: entry.handle,
                    count: entry.count,
                    visible,
                };
            }
        }

        let handle = self.sink.show(&Notification::from_envelope(envelope, 1));
        self.live.push_back(LiveNotification {
            handle,
            expires_at: now + self.display_lifetime,
        });
        while self.live.len() > self.max_visible {
            if let Some(oldest) = self.live.pop_front() {
                self.sink.dismiss(oldest.handle);
            }
        }

        self.entries.insert(
            key,
            AggregationEntry {
                handle,
                count: 1,
                last_seen: now,
            },
        );
        IngestEffect::Created { handle }
    }

    /// Dismiss expired notifications and forget keys that can no longer
    /// aggregate. Called on every ingest and periodically by Event Ingest.
    pub fn expire(&mut self, now: Instant) {
        while let Some(front) = self.live.front().copied() {
            if front.expires_at > now {
                break;
            }
            self.live.pop_front();
            self.sink.dismiss(front.handle);
        }

        let window = self.window;
        let live = &self.live;
        self.entries.retain(|_, entry| {
            now.saturating_duration_since(entry.last_seen) < window
                || live.iter().any(|n| n.handle == entry.handle)
        });
    }

    pub fn entry(&self, key: &AggregationKey) -> Option<&AggregationEntry> {
        self.entries.get(key)
    }

    pub fn live_handles(&self) -> Vec<NotificationHandle> {
        self.live.iter().map(|n| n.handle).collect()
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Dismiss everything still on display.
    pub fn clear(&mut self) {
        for notification in self.live.drain(..) {
            self.sink.dismiss(notification.handle);
        }
        self.entries.clear();
    }
}
