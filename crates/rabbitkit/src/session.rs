//! Reconciliation session: backend plus per-user permission cache.
//!
//! A [`Session`] lives for one reconciliation pass. The first lookup for a
//! user runs `list_user_permissions`; every later lookup for that user is
//! served from the cache until [`Session::reset`] is called.

use crate::backend::Backend;
use crate::error::Result;
use crate::parser::parse_user_permissions;
use crate::types::{Invocation, PermissionMap, PermissionRecord};
use std::collections::HashMap;

/// Cached listing results, keyed by user.
///
/// A missing key means the user was never looked up. `Some(None)` means the
/// user was looked up and has no permissions on any vhost.
#[derive(Debug, Default)]
pub struct PermissionCache {
    users: HashMap<String, Option<PermissionMap>>,
}

impl PermissionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for a user, if the user was looked up.
    pub fn get(&self, user: &str) -> Option<Option<&PermissionMap>> {
        self.users.get(user).map(Option::as_ref)
    }

    /// Whether the user was looked up in this pass.
    pub fn contains(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    /// Store a lookup result.
    pub fn insert(&mut self, user: impl Into<String>, permissions: Option<PermissionMap>) {
        self.users.insert(user.into(), permissions);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.users.clear();
    }

    /// Number of users cached.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// One reconciliation pass against a broker.
pub struct Session {
    backend: Box<dyn Backend>,
    cache: PermissionCache,
}

impl Session {
    /// Create a session over a backend.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            cache: PermissionCache::new(),
        }
    }

    /// The backend this session runs commands through.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The permission cache.
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Drop all cached listings so the next lookup queries the broker again.
    pub fn reset(&mut self) {
        log::trace!("Clearing permission cache ({} users)", self.cache.len());
        self.cache.clear();
    }

    /// All permissions of a user, keyed by vhost.
    ///
    /// Returns `Ok(None)` if the user has no permissions. The broker is
    /// queried at most once per user until [`reset`](Self::reset); a parse
    /// failure leaves the cache untouched.
    pub fn lookup(&mut self, user: &str) -> Result<Option<&PermissionMap>> {
        if !self.cache.contains(user) {
            log::trace!("Permission cache miss for {user}");
            let output = self.backend.list("user_permissions", &[user])?;
            let permissions = parse_user_permissions(&output)?;
            self.cache.insert(user, permissions);
        } else {
            log::trace!("Permission cache hit for {user}");
        }

        Ok(self.cache.get(user).flatten())
    }

    /// Actual permissions of a user on one vhost.
    pub fn record(&mut self, user: &str, vhost: &str) -> Result<Option<PermissionRecord>> {
        Ok(self
            .lookup(user)?
            .and_then(|permissions| permissions.get(vhost))
            .cloned())
    }

    /// Run a mutating command through the backend.
    pub fn run(&self, invocation: &Invocation) -> Result<()> {
        self.backend.run(invocation)
    }
}
