// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Operational events pushed by the remote system and the notifications
//! derived from them.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::error::ConsoleError;

/// One operational event from `GET /events/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

impl EventEnvelope {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: None,
            ts: None,
            event_type: event_type.into(),
            tool: None,
            intent: None,
            outcome: None,
            risk: None,
            latency_ms: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn aggregation_key(&self) -> AggregationKey {
        AggregationKey::from_envelope(self)
    }

    pub fn tone(&self) -> NotificationTone {
        match self.outcome.as_deref() {
            Some("error") => NotificationTone::Error,
            Some("blocked") => NotificationTone::Warning,
            _ => NotificationTone::Ok,
        }
    }

    /// `type` or `type · tool`.
    pub fn title(&self) -> String {
        match non_empty(&self.tool) {
            Some(tool) => format!("{} · {}", self.event_type, tool),
            None => self.event_type.clone(),
        }
    }

    /// `intent • outcome` with placeholders for missing fields.
    pub fn description(&self) -> String {
        format!(
            "{} • {}",
            non_empty(&self.intent).unwrap_or("(no-intent)"),
            non_empty(&self.outcome).unwrap_or("unknown")
        )
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// `type|tool|outcome`, absent fields as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregationKey(String);

impl AggregationKey {
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self(format!(
            "{}|{}|{}",
            envelope.event_type,
            envelope.tool.as_deref().unwrap_or_default(),
            envelope.outcome.as_deref().unwrap_or_default()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationTone {
    Ok,
    Warning,
    Error,
}

/// Identifier assigned by the notification surface when a notification is
/// first shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationHandle(pub u64);

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content of a live notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub tone: NotificationTone,
    pub count: u32,
}

impl Notification {
    pub fn from_envelope(envelope: &EventEnvelope, count: u32) -> Self {
        let base = envelope.description();
        let description = if count > 1 {
            format!("{} (x{})", base, count)
        } else {
            base
        };
        Self {
            title: envelope.title(),
            description,
            tone: envelope.tone(),
            count,
        }
    }
}

/// Consumer of the Aggregation Engine's output.
///
/// The engine is the only caller; implementations render, buffer or
/// forward the notifications.
pub trait NotificationSink: Send {
    fn show(&mut self, notification: &Notification) -> NotificationHandle;

    /// Replace the content of a notification still on display.
    fn update(&mut self, handle: NotificationHandle, notification: &Notification);

    fn dismiss(&mut self, handle: NotificationHandle);
}

/// Raw message payloads, one per event, in arrival order.
pub type MessageStream = BoxStream<'static, String>;

/// Push channel carrying serialized envelopes.
///
/// Connection management (including resubscription) belongs to the
/// implementation; the stream ends only when the source gives up.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&self) -> Result<MessageStream, ConsoleError>;
}
