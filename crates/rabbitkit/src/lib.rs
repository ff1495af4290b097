//! # rabbitkit
//!
//! Pure Rust library for reconciling RabbitMQ user permissions through
//! `rabbitmqctl`.
//!
//! This crate provides functionality for:
//! - Parsing `rabbitmqctl list_user_permissions` output
//! - Caching listings for the length of one reconciliation pass
//! - Diffing declared permissions against the broker
//! - Granting, updating and clearing permissions with a single command each
//!
//! ## Example
//!
//! ```no_run
//! use rabbitkit::{DesiredPermission, Ensure, PermissionProvider, Session};
//!
//! let backend = rabbitkit::backend::default_backend().expect("rabbitmqctl not available");
//! let mut session = Session::new(Box::new(backend));
//!
//! let desired = DesiredPermission::from_name("app@/")
//!     .expect("valid name")
//!     .with(rabbitkit::PermissionKind::Read, ".*");
//! let mut provider = PermissionProvider::new(desired);
//!
//! let change = provider.plan(&mut session, Ensure::Present).expect("listing failed");
//! provider.apply(&mut session, &change).expect("rabbitmqctl failed");
//! ```
//!
//! ## Batching
//!
//! Setters on a [`PermissionProvider`] only stage values. A single
//! [`PermissionProvider::flush`] sends one `set_permissions` with all three
//! columns, so changing two columns never costs two broker round-trips.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod parser;
pub mod provider;
pub mod session;
pub mod types;
pub mod version;

pub use error::{Error, ErrorCategory, Result};
pub use provider::{Change, Drift, PendingChanges, PermissionProvider};
pub use session::{PermissionCache, Session};
pub use types::{
    DesiredPermission, EMPTY_TOKEN, Ensure, Invocation, PermissionKind, PermissionMap,
    PermissionRecord,
};
