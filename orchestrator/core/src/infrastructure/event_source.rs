// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server-Sent Events transport for the live event feed
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Decode `text/event-stream` frames into message payloads
//! - **Integration:** `GET /events/stream` → this source → Event Ingest
//!
//! The transport owns reconnection: when the stream drops it waits the
//! reconnect delay (or the server's `retry:` hint) and resubscribes. Event
//! Ingest never sees the gap.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::error::ConsoleError;
use crate::domain::events::{EventSource, MessageStream};
use crate::infrastructure::api_client::AuroraApi;

/// One dispatched SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<u64>,
}

impl SseFrame {
    /// Unnamed frames and `event: message` carry envelopes. Everything else
    /// (keep-alive pings, custom events) is ignored.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message")) && !self.data.is_empty()
    }
}

/// Incremental `text/event-stream` decoder.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere; bytes are
/// buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current: SseFrame,
    has_fields: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.feed_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if !self.has_fields {
                return None;
            }
            self.has_fields = false;
            return Some(std::mem::take(&mut self.current));
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if !self.current.data.is_empty() {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
            }
            "event" => self.current.event = Some(value.to_string()),
            "id" => self.current.id = Some(value.to_string()),
            "retry" => match value.parse() {
                Ok(ms) => self.current.retry = Some(ms),
                Err(_) => return None,
            },
            _ => return None,
        }
        self.has_fields = true;
        None
    }
}

/// Live event feed over HTTP with automatic resubscription.
pub struct HttpEventSource {
    api: AuroraApi,
    path: String,
    reconnect_delay: Duration,
    cancel: CancellationToken,
}

impl HttpEventSource {
    pub fn new(api: AuroraApi, path: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            api,
            path: path.into(),
            reconnect_delay,
            cancel: CancellationToken::new(),
        }
    }

    /// Ends every stream handed out by this source when cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

struct Subscription {
    api: AuroraApi,
    path: String,
    reconnect_delay: Duration,
    cancel: CancellationToken,
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
}

impl Subscription {
    fn accept(&mut self, chunk: &[u8]) {
        for frame in self.decoder.push(chunk) {
            if let Some(ms) = frame.retry {
                debug!(retry_ms = ms, "Server adjusted reconnect delay");
                self.reconnect_delay = Duration::from_millis(ms);
            }
            if frame.is_message() {
                self.pending.push_back(frame.data);
            } else if frame.event.is_some() {
                debug!(event = ?frame.event, "Skipping non-message frame");
            }
        }
    }

    async fn reconnect(&mut self) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            _ = tokio::time::sleep(self.reconnect_delay) => {}
        }

        match self.api.open_stream(&self.path).await {
            Ok(response) => {
                info!(path = %self.path, "Event stream reconnected");
                self.decoder = SseDecoder::new();
                self.body = Some(response.bytes_stream().boxed());
            }
            Err(e) => warn!(path = %self.path, error = %e, "Event stream reconnect failed"),
        }
    }

    async fn next_message(mut self) -> Option<(String, Self)> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some((message, self));
            }
            if self.cancel.is_cancelled() {
                return None;
            }

            let Some(body) = self.body.as_mut() else {
                self.reconnect().await;
                continue;
            };

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => self.accept(&chunk),
                Some(Err(e)) => {
                    warn!(path = %self.path, error = %e, "Event stream interrupted");
                    self.body = None;
                }
                None => {
                    debug!(path = %self.path, "Event stream closed by server");
                    self.body = None;
                }
            }
        }
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    /// The first connection is opened eagerly so an unreachable service is
    /// reported to the caller. Later drops are handled inside the stream.
    async fn subscribe(&self) -> Result<MessageStream, ConsoleError> {
        let response = self.api.open_stream(&self.path).await?;
        info!(url = %self.api.url(&self.path), "Subscribed to event stream");

        let subscription = Subscription {
            api: self.api.clone(),
            path: self.path.clone(),
            reconnect_delay: self.reconnect_delay,
            cancel: self.cancel.clone(),
            body: Some(response.bytes_stream().boxed()),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        };

        Ok(stream::unfold(subscription, Subscription::next_message).boxed())
    }
}
