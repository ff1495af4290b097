//! Execution engine with UI integration

use anyhow::Result;
use colored::Colorize;
use rabbitkit::Session;
use serde::Serialize;

use crate::resource::{ApplyContext, ApplyResult, Resource};

use super::differ::{compute_diffs, display_diff};
use super::planner::ExecutionPlan;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
}

/// Summary of execution results
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Diff, confirm and converge the plan
pub fn execute(
    mut plan: ExecutionPlan,
    session: &mut Session,
    opts: ExecuteOptions,
) -> Result<ExecuteSummary> {
    let diffs = compute_diffs(&plan.resources, session)?;

    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary {
            no_change: plan.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(apply_resources(&mut plan.resources, session, true));
    }

    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    println!();
    println!(
        "  {} Applying {} permission changes...",
        "→".cyan(),
        diffs.len()
    );

    let summary = apply_resources(&mut plan.resources, session, false);

    print_summary(&summary);

    Ok(summary)
}

/// Apply every resource in order; a failure is recorded and the pass continues
pub fn apply_resources(
    resources: &mut [Box<dyn Resource>],
    session: &mut Session,
    dry_run: bool,
) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();

    for resource in resources.iter_mut() {
        let mut ctx = ApplyContext { dry_run, session };

        let result = match resource.apply(&mut ctx) {
            Ok(r) => r,
            Err(e) => ApplyResult::Failed {
                error: format!("{e:#}"),
            },
        };

        match &result {
            ApplyResult::NoChange => log::debug!("{} already in sync", resource.id()),
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => {
                println!("    {} {}", "✓".green(), resource.id());
            }
            ApplyResult::Failed { error } => {
                println!("    {} {}: {}", "✗".red(), resource.id(), error);
            }
            ApplyResult::Skipped { reason } => {
                println!("    {} {} ({})", "⊘".dimmed(), resource.id(), reason);
            }
        }

        summary.record(&result);
    }

    summary
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() && summary.total_changes() == 0 {
        println!("  {} Nothing changed", "○".dimmed());
        return;
    }
    if summary.is_success() {
        println!("  {} Permissions applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Permissions applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} permissions granted", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} permissions updated", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} permissions cleared", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} permissions skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "permissions".red());
    }
}
