// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Aurora console CLI

pub mod config;
pub mod consent;
pub mod events;
pub mod plan;

pub use self::config::ConfigCommand;
pub use self::consent::ConsentCommand;
pub use self::events::EventsCommand;
pub use self::plan::{PlanArgs, RunArgs};
