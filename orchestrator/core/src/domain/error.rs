// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

/// Failures produced by the consent workflow, the execution gateway and the
/// event pipeline.
///
/// Every variant is local and recoverable: the caller re-invokes the
/// operation that produced it. `Parse` never leaves Event Ingest and
/// `Superseded` is never reported to the discarded caller.
#[derive(Debug, Clone, Error)]
pub enum ConsoleError {
    /// Remote service answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Transport {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a status (connect, TLS).
    #[error("{endpoint} unreachable: {message}")]
    Connection { endpoint: String, message: String },

    /// A success status whose body could not be read or had the wrong shape.
    /// The server has already acted on the request.
    #[error("{endpoint} sent an unreadable reply: {message}")]
    Decode { endpoint: String, message: String },

    #[error("malformed payload: {0}")]
    Parse(String),

    /// The negotiation or call was discarded before its result arrived.
    #[error("superseded by a newer negotiation")]
    Superseded,

    #[error("invalid negotiation state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: String,
    },

    #[error("invalid consent request: {0}")]
    InvalidRequest(String),

    #[error("server recorded '{returned}' for a '{requested}' decision")]
    DecisionMismatch { requested: String, returned: String },

    #[error("authorization challenge for '{action}' persisted after approval")]
    UnresolvedChallenge { action: String },
}

impl ConsoleError {
    /// Errors that must be dropped without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, ConsoleError::Superseded)
    }

    /// Transport failures that may be retried without side effects on the
    /// server: the request never reached a handler.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsoleError::Connection { .. })
    }

    pub(crate) fn connection(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ConsoleError::Connection {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ConsoleError::Decode {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }
}
