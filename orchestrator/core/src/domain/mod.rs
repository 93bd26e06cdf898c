// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain types and the ports implemented by infrastructure
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Consent, execution and event models plus configuration

pub mod consent;
pub mod console_config;
pub mod error;
pub mod events;
pub mod execution;
