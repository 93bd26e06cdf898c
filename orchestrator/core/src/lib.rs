// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Aurora Console Core
//!
//! Client-side plumbing for the Aurora agent console: consent negotiation,
//! plan execution behind authorization challenges, and live event
//! aggregation.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, use cases and HTTP adapters shared by the CLI

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
