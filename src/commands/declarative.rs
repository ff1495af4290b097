//! Declarative commands
//!
//! - `status` - Show current state vs declared state
//! - `diff` - Preview what apply would change
//! - `apply` - Make the broker match the declarations

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use rabbitkit::Session;
use rabbitkit::backend::Backend;
use rabbitkit::version::Version;
use serde::Serialize;

use super::{load_config, open_backend, open_session};
use crate::Context;
use crate::config::WarrenConfig;
use crate::engine::{self, ExecuteOptions, ExecutionPlan};
use crate::resource::ResourceState;
use crate::ui;

/// Build the plan for `target` from the config
pub fn build_plan(config: &WarrenConfig, target: Option<&str>) -> Result<ExecutionPlan> {
    let declarations = config
        .declarations()
        .context("Invalid permissions in warren config")?;

    let plan = ExecutionPlan::from_declarations(declarations).filter_by_target(target);

    if plan.is_empty() {
        match target {
            Some(t) => ui::warn(&format!("No declared permissions match '{t}'")),
            None => ui::warn("No permissions declared"),
        }
    }

    Ok(plan)
}

// ============================================================================
// Status
// ============================================================================

/// One row of `warren status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub id: String,
    pub resource_type: String,
    pub in_sync: bool,
    pub current: ResourceState,
    pub desired: ResourceState,
}

pub fn collect_status(plan: &ExecutionPlan, session: &mut Session) -> Result<Vec<StatusEntry>> {
    plan.resources
        .iter()
        .map(|resource| -> Result<StatusEntry> {
            let current = resource.current_state(session)?;
            let desired = resource.desired_state();
            Ok(StatusEntry {
                id: resource.id(),
                resource_type: resource.resource_type().to_string(),
                in_sync: current == desired,
                current,
                desired,
            })
        })
        .collect()
}

const UNREACHABLE: &str = "unreachable";

/// Broker line of the status header; availability is only checked when no
/// version was detected
fn broker_version(version: Option<&Version>, is_available: impl FnOnce() -> bool) -> String {
    match version {
        Some(v) => v.to_string(),
        None if is_available() => "unknown".to_string(),
        None => UNREACHABLE.to_string(),
    }
}

pub fn status(ctx: &Context, target: Option<&str>, json: bool) -> Result<()> {
    let config = load_config(ctx)?;
    let plan = build_plan(&config, target)?;
    let backend = open_backend(ctx, &config)?;
    let path = backend.path().display().to_string();

    if !json {
        ui::header("Permissions Status");
        ui::kv("rabbitmqctl", &path);
        let broker = broker_version(backend.version(), || backend.is_available());
        if broker == UNREACHABLE {
            ui::kv("RabbitMQ", &broker.red().to_string());
        } else {
            ui::kv("RabbitMQ", &broker);
        }
        println!();
    }

    let mut session = Session::new(Box::new(backend));
    let entries = collect_status(&plan, &mut session)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let (symbol, note) = match (&entry.current, &entry.desired) {
            _ if entry.in_sync => ("✓".green(), String::new()),
            (ResourceState::Absent, _) => ("+".green(), "not granted".to_string()),
            (ResourceState::Modified { from, to }, _) => ("~".yellow(), format!("{from} → {to}")),
            (ResourceState::Present { .. }, ResourceState::Absent) => {
                ("-".red(), "should be cleared".to_string())
            }
            _ => ("?".dimmed(), String::new()),
        };
        println!("  {} {:<30} {}", symbol, entry.id, note.dimmed());
    }

    let drifted = entries.iter().filter(|e| !e.in_sync).count();
    println!();
    if drifted == 0 {
        ui::success(&format!("{} permissions in sync", entries.len()));
    } else {
        ui::info(&format!(
            "{drifted} of {} permissions out of sync. Run 'warren apply' to converge.",
            entries.len()
        ));
    }

    Ok(())
}

// ============================================================================
// Diff / Apply
// ============================================================================

pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let plan = build_plan(&config, target)?;
    let mut session = open_session(ctx, &config)?;

    let diffs = engine::compute_diffs(&plan.resources, &mut session)?;
    engine::display_diff(&diffs);

    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let config = load_config(ctx)?;
    let plan = build_plan(&config, target)?;
    if plan.is_empty() {
        return Ok(());
    }

    let mut session = open_session(ctx, &config)?;
    let summary = engine::execute(plan, &mut session, ExecuteOptions { dry_run, yes })?;

    if !summary.is_success() {
        bail!("{} permissions failed to apply", summary.failed);
    }

    Ok(())
}
