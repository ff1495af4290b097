//! Resource trait and types for declarative broker configuration
//!
//! Every declaration in warren is modeled as a Resource with:
//! - State detection (current vs desired), read through the session cache
//! - Apply function (converge current → desired) with at most one command

use anyhow::Result;
use rabbitkit::Session;
use serde::Serialize;
use std::fmt;

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ResourceState {
    /// Resource exists/is configured
    Present { details: Option<String> },
    /// Resource does not exist/is not configured
    Absent,
    /// Resource exists but differs from desired
    Modified { from: String, to: String },
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

/// Context passed to apply operations
pub struct ApplyContext<'a> {
    /// Report what would change without running anything
    pub dry_run: bool,
    pub session: &'a mut Session,
}

/// Core trait for all resources in warren
pub trait Resource: fmt::Debug {
    /// Unique identifier for this resource (e.g., "app@/")
    fn id(&self) -> String;

    /// Resource type category (e.g., "permission")
    fn resource_type(&self) -> &'static str;

    /// Detect current state of this resource
    fn current_state(&self, session: &mut Session) -> Result<ResourceState>;

    /// Get the desired state (from config)
    fn desired_state(&self) -> ResourceState;

    /// Apply changes to reach desired state
    fn apply(&mut self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

pub mod permission;

pub use permission::PermissionResource;
