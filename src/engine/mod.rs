//! Execution engine for warren
//!
//! The engine orchestrates:
//! 1. Planning - Build resources from declarations
//! 2. Diffing - Compute current vs desired state
//! 3. Executing - Converge each resource with at most one rabbitmqctl call

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::{compute_diffs, display_diff};
pub use executor::{ExecuteOptions, execute};
pub use planner::ExecutionPlan;
