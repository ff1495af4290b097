//! Diff computation and display

use anyhow::Result;
use colored::Colorize;
use rabbitkit::Session;
use serde::Serialize;

use crate::resource::{Resource, ResourceState};

/// Difference between current and desired state of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDiff {
    pub resource_id: String,
    pub current: ResourceState,
    pub desired: ResourceState,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource, session: &mut Session) -> Result<Option<Self>> {
        let current = resource.current_state(session)?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            current,
            desired,
        }))
    }

    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }
}

/// Compute diffs for all resources
///
/// A listing that cannot be read or parsed aborts the whole computation.
pub fn compute_diffs(
    resources: &[Box<dyn Resource>],
    session: &mut Session,
) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for resource in resources {
        if let Some(diff) = ResourceDiff::from_resource(resource.as_ref(), session)? {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Counts of additions, removals and modifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
}

impl DiffSummary {
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }
}

fn symbol(diff: &ResourceDiff) -> colored::ColoredString {
    if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else {
        "~".yellow()
    }
}

fn state_description(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(not granted){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
        (ResourceState::Present { details }, ResourceState::Absent) => format!(
            "{} → (cleared)",
            details.as_deref().unwrap_or("granted")
        ),
        _ => String::new(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Permissions Diff".bold()
    );
    println!("│");

    for diff in diffs {
        println!("│   {} {:<30}", symbol(diff), diff.resource_id);
        println!("│       {}", state_description(diff).dimmed());
    }
    println!("│");

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to grant, {} to update, {} to clear)",
        diffs.len().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
