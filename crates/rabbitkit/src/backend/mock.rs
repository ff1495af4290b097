//! In-memory backend for tests.
//!
//! Listing output is scripted per user; mutating invocations are recorded
//! instead of executed.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::Invocation;
use std::collections::HashMap;
use std::sync::Mutex;

/// A scripted [`Backend`] that records every call.
#[derive(Default)]
pub struct MockBackend {
    listings: Mutex<HashMap<String, String>>,
    list_calls: Mutex<Vec<(String, Vec<String>)>>,
    invocations: Mutex<Vec<Invocation>>,
    run_failure: Mutex<Option<String>>,
}

impl MockBackend {
    /// Create a backend with no scripted output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the `list_user_permissions` output for a user.
    pub fn with_listing(self, user: impl Into<String>, output: impl Into<String>) -> Self {
        lock(&self.listings).insert(user.into(), output.into());
        self
    }

    /// Make every mutating command fail with the given stderr.
    pub fn failing_runs(self, stderr: impl Into<String>) -> Self {
        *lock(&self.run_failure) = Some(stderr.into());
        self
    }

    /// Number of list calls made so far.
    pub fn list_count(&self) -> usize {
        lock(&self.list_calls).len()
    }

    /// List calls made so far, as (entity, args).
    pub fn list_calls(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.list_calls).clone()
    }

    /// Mutating invocations recorded so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    /// Recorded invocations rendered as command lines.
    pub fn commands(&self) -> Vec<String> {
        self.invocations().iter().map(ToString::to_string).collect()
    }
}

impl Backend for MockBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn list(&self, entity: &str, args: &[&str]) -> Result<String> {
        lock(&self.list_calls).push((
            entity.to_string(),
            args.iter().map(|a| (*a).to_string()).collect(),
        ));

        let user = args.first().copied().unwrap_or_default();
        Ok(lock(&self.listings).get(user).cloned().unwrap_or_default())
    }

    fn run(&self, invocation: &Invocation) -> Result<()> {
        lock(&self.invocations).push(invocation.clone());

        match lock(&self.run_failure).as_deref() {
            Some(stderr) => Err(Error::from_rabbitmqctl_output(&invocation.subcommand, stderr)),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
