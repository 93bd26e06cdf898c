// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP plumbing shared by the Aurora service clients

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::ConsoleError;

/// Base URL plus a pooled HTTP client.
///
/// No global timeout: the event stream is long-lived and request timeouts
/// are left to the transport.
#[derive(Debug, Clone)]
pub struct AuroraApi {
    client: Client,
    base_url: String,
}

impl AuroraApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConsoleError> {
        let base_url = base_url.into();
        let client = Client::builder()
            .build()
            .map_err(|e| ConsoleError::connection(&base_url, e))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode a JSON reply.
    ///
    /// Non-success statuses become `Transport` carrying the response text.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ConsoleError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(path = %path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ConsoleError::connection(path, e))?;

        // A status arrived, so the handler ran: nothing past this point is retryable.
        let status = response.status();
        let text = response.text().await.map_err(|e| ConsoleError::decode(path, e))?;

        if !status.is_success() {
            return Err(ConsoleError::Transport {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ConsoleError::decode(path, format!("{} in {}", e, text)))
    }

    /// Open a streaming GET. The caller consumes the body.
    pub async fn open_stream(&self, path: &str) -> Result<reqwest::Response, ConsoleError> {
        debug!(path = %path, "GET (stream)");
        let response = self
            .client
            .get(self.url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ConsoleError::connection(path, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::Transport {
                endpoint: path.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }
}
