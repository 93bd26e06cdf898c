// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Plan and run commands
//!
//! `plan` asks the planner for steps without executing them. `run` executes
//! a plan through the Execution Gateway, prompting for consent whenever the
//! executor raises an authorization challenge.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use aurora_console_core::consent::ConsentDecision;
use aurora_console_core::execution::{ExecutionPlan, PlanOutcome, StepResult};

use crate::console::{cancel_on_interrupt, load_config, Console, ConsoleOverrides};

#[derive(Args)]
pub struct PlanArgs {
    /// Natural-language request for the planner
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Planner context (JSON object or @file.json)
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Natural-language request (ignored with --plan-file)
    #[arg(value_name = "INPUT", required_unless_present = "plan_file")]
    pub input: Option<String>,

    /// Planner context (JSON object or @file.json)
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Execute a saved plan (YAML or JSON) instead of planning
    #[arg(long, value_name = "FILE")]
    pub plan_file: Option<PathBuf>,

    /// Approve every consent challenge without prompting
    #[arg(long, conflicts_with = "deny")]
    pub approve: bool,

    /// Deny every consent challenge without prompting
    #[arg(long)]
    pub deny: bool,
}

pub async fn plan(args: PlanArgs, overrides: ConsoleOverrides) -> Result<()> {
    let console = Console::new(load_config(&overrides)?)?;
    let context = parse_context(args.context.as_deref())?;

    let plan = console
        .gateway()
        .plan(&args.input, &context)
        .await
        .context("Failed to create plan")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }

    Ok(())
}

pub async fn run(args: RunArgs, overrides: ConsoleOverrides) -> Result<()> {
    let console = Console::new(load_config(&overrides)?)?;
    let gateway = console.gateway();

    let plan = match (&args.plan_file, &args.input) {
        (Some(path), _) => load_plan(path)?,
        (None, Some(input)) => {
            let context = parse_context(args.context.as_deref())?;
            gateway.plan(input, &context).await.context("Failed to create plan")?
        }
        (None, None) => anyhow::bail!("Provide INPUT or --plan-file"),
    };
    print_plan(&plan);

    let preset = preset_decision(args.approve, args.deny);
    let resolver = console.resolver(console.orchestrator(), preset);

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    match gateway.run(&plan, &resolver, &cancel).await {
        Ok(PlanOutcome::Completed(result)) => {
            println!();
            println!("{}", "✓ Plan executed".green());
            print_results(&result);
            Ok(())
        }
        Ok(PlanOutcome::Denied(challenge)) => {
            println!();
            println!(
                "{}",
                format!("Plan abandoned: consent for '{}' denied", challenge.action).yellow()
            );
            Ok(())
        }
        Err(e) if e.is_silent() => {
            println!("{}", "Cancelled".dimmed());
            Ok(())
        }
        Err(e) => Err(e).context("Plan execution failed"),
    }
}

pub(crate) fn preset_decision(approve: bool, deny: bool) -> Option<ConsentDecision> {
    match (approve, deny) {
        (true, _) => Some(ConsentDecision::Approved),
        (_, true) => Some(ConsentDecision::Denied),
        _ => None,
    }
}

/// Accepts inline JSON or `@path` to a JSON file. Must be an object.
pub(crate) fn parse_context(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };

    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read context file {:?}", path))?,
        None => raw.to_string(),
    };

    let value: Value = serde_json::from_str(&text).context("Context is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Context must be a JSON object, got {}", other),
    }
}

fn load_plan(path: &PathBuf) -> Result<ExecutionPlan> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read plan file {:?}", path))?;
    // YAML is a superset of JSON.
    let plan: ExecutionPlan =
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse plan file {:?}", path))?;
    Ok(plan)
}

fn print_plan(plan: &ExecutionPlan) {
    println!("{} {}", "Plan:".bold(), plan.intent);
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step.action().cyan());
        for (key, value) in &step.args {
            println!("       {}: {}", key.dimmed(), value);
        }
    }
}

fn print_results(results: &[StepResult]) {
    for result in results {
        println!("  {} {}", result.step.bold(), result.out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_context() {
        let context = parse_context(Some(r#"{"user":"ops"}"#)).unwrap();
        assert_eq!(context["user"], "ops");
        assert!(parse_context(None).unwrap().is_empty());
    }

    #[test]
    fn test_context_must_be_object() {
        assert!(parse_context(Some("[1,2]")).is_err());
        assert!(parse_context(Some("{oops")).is_err());
    }

    #[test]
    fn test_context_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.json");
        std::fs::write(&path, r#"{"locale":"en"}"#).unwrap();

        let context = parse_context(Some(&format!("@{}", path.display()))).unwrap();
        assert_eq!(context["locale"], "en");
    }

    #[test]
    fn test_load_yaml_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        std::fs::write(
            &path,
            "intent: tidy\nsteps:\n  - tool: files\n    op: delete\n    args:\n      path: /tmp/x\n",
        )
        .unwrap();

        let plan = load_plan(&path).unwrap();
        assert_eq!(plan.steps[0].action(), "files.delete");
        assert_eq!(plan.steps[0].args["path"], "/tmp/x");
    }

    #[test]
    fn test_preset_decision() {
        assert_eq!(preset_decision(true, false), Some(ConsentDecision::Approved));
        assert_eq!(preset_decision(false, true), Some(ConsentDecision::Denied));
        assert_eq!(preset_decision(false, false), None);
    }
}
