//! Backend abstraction for rabbitmqctl.
//!
//! The [`Backend`] trait is the only place this crate talks to the broker,
//! allowing for different implementations (real CLI, mock for testing).

pub mod mock;
pub mod rabbitmqctl;

use crate::error::Result;
use crate::types::Invocation;

/// Backend trait for rabbitmqctl operations.
///
/// Every call blocks until the external command returns. A failing command
/// is returned as an error and never retried.
pub trait Backend: Send + Sync {
    /// Check if rabbitmqctl can be executed.
    fn is_available(&self) -> bool;

    /// Run a read-only `list_<entity>` query and return its raw output.
    ///
    /// Implementations strip informational banners and table headers so the
    /// output holds data rows only.
    fn list(&self, entity: &str, args: &[&str]) -> Result<String>;

    /// Run a mutating command.
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn list(&self, entity: &str, args: &[&str]) -> Result<String> {
        (**self).list(entity, args)
    }

    fn run(&self, invocation: &Invocation) -> Result<()> {
        (**self).run(invocation)
    }
}

/// Get the default backend (real rabbitmqctl CLI).
pub fn default_backend() -> Result<rabbitmqctl::RabbitmqctlBackend> {
    rabbitmqctl::RabbitmqctlBackend::new()
}
