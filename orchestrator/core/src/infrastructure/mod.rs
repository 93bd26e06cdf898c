// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod api_client;
pub mod consent_client;
pub mod event_source;
pub mod executor_client;

pub use api_client::AuroraApi;
pub use consent_client::HttpConsentChannel;
pub use event_source::{HttpEventSource, SseDecoder, SseFrame};
pub use executor_client::HttpExecutorClient;
