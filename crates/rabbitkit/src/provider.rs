//! Permission provider: converges one declared permission.
//!
//! The provider never talks to the broker on its own; every read goes
//! through the [`Session`] cache and every write is a single rabbitmqctl
//! invocation. Attribute setters only stage values, and [`flush`] turns all
//! staged values into exactly one `set_permissions` call.
//!
//! [`flush`]: PermissionProvider::flush

use crate::error::Result;
use crate::session::Session;
use crate::types::{DesiredPermission, Ensure, Invocation, PermissionKind, PermissionRecord};
use serde::Serialize;

/// Permission values staged by setters and not yet sent to the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    values: [Option<String>; 3],
}

impl PendingChanges {
    /// Stage a value, replacing any earlier one for the same kind.
    pub fn stage(&mut self, kind: PermissionKind, value: impl Into<String>) {
        self.values[kind.index()] = Some(value.into());
    }

    /// Staged value for a kind.
    pub fn get(&self, kind: PermissionKind) -> Option<&str> {
        self.values[kind.index()].as_deref()
    }

    /// Whether anything is staged.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Kinds with a staged value.
    pub fn kinds(&self) -> Vec<PermissionKind> {
        PermissionKind::ALL
            .into_iter()
            .filter(|k| self.values[k.index()].is_some())
            .collect()
    }

    /// Discard everything staged.
    pub fn clear(&mut self) {
        self.values = Default::default();
    }
}

/// A permission column that differs from its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    /// Which column
    pub kind: PermissionKind,
    /// Value on the broker
    pub current: String,
    /// Declared value
    pub desired: String,
}

/// What it takes to converge one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Change {
    /// Broker already matches
    Unchanged,
    /// Permissions are missing and will be set
    Create,
    /// Some columns differ
    Update {
        /// Differing columns
        drift: Vec<Drift>,
    },
    /// Permissions exist and will be cleared
    Destroy,
}

impl Change {
    /// Whether applying this change runs a command.
    pub fn is_change(&self) -> bool {
        !matches!(self, Change::Unchanged)
    }
}

/// Converges one [`DesiredPermission`] against a broker.
#[derive(Debug, Clone)]
pub struct PermissionProvider {
    desired: DesiredPermission,
    pending: PendingChanges,
}

impl PermissionProvider {
    /// Create a provider for a declaration.
    pub fn new(desired: DesiredPermission) -> Self {
        Self {
            desired,
            pending: PendingChanges::default(),
        }
    }

    /// The declaration, including values staged by setters.
    pub fn desired(&self) -> &DesiredPermission {
        &self.desired
    }

    /// Values staged and not yet flushed.
    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    /// Actual permissions for this user and vhost, or `None` if absent.
    pub fn exists(&self, session: &mut Session) -> Result<Option<PermissionRecord>> {
        session.record(&self.desired.user, &self.desired.vhost)
    }

    /// Actual value of one permission column.
    ///
    /// Served from the session cache, so calling it before or after
    /// [`exists`](Self::exists) costs at most one listing per user.
    pub fn get(&self, session: &mut Session, kind: PermissionKind) -> Result<Option<String>> {
        Ok(self.exists(session)?.map(|record| record.get(kind).to_string()))
    }

    /// Stage a new value for one permission column.
    pub fn set(&mut self, kind: PermissionKind, value: impl Into<String>) {
        let value = value.into();
        log::debug!("Staging {kind}={value} for {}", self.desired.name());
        self.desired.set(kind, value.clone());
        self.pending.stage(kind, value);
    }

    /// Send all staged values in one `set_permissions` call.
    ///
    /// Columns without a staged value keep their current broker value.
    /// Returns `false` if nothing was staged.
    pub fn flush(&mut self, session: &mut Session) -> Result<bool> {
        if self.pending.is_empty() {
            return Ok(false);
        }

        let current = self.exists(session)?;
        let values = PermissionKind::ALL.map(|kind| {
            self.pending
                .get(kind)
                .map(str::to_string)
                .or_else(|| current.as_ref().map(|r| r.get(kind).to_string()))
                .unwrap_or_default()
        });

        self.set_permissions(session, &values)?;
        self.pending.clear();
        Ok(true)
    }

    /// Grant the declared permissions; undeclared columns are set empty.
    pub fn create(&mut self, session: &mut Session) -> Result<()> {
        let values = PermissionKind::ALL
            .map(|kind| self.desired.get(kind).unwrap_or_default().to_string());

        self.set_permissions(session, &values)?;
        self.pending.clear();
        Ok(())
    }

    /// Clear all permissions of the user on the vhost.
    pub fn destroy(&mut self, session: &mut Session) -> Result<()> {
        let invocation = Invocation::clear_permissions(&self.desired.vhost, &self.desired.user);
        session.run(&invocation)?;
        self.pending.clear();
        Ok(())
    }

    /// Work out what converging to `ensure` requires.
    pub fn plan(&self, session: &mut Session, ensure: Ensure) -> Result<Change> {
        let current = self.exists(session)?;

        let change = match (ensure, current) {
            (Ensure::Present, None) => Change::Create,
            (Ensure::Absent, Some(_)) => Change::Destroy,
            (Ensure::Absent, None) => Change::Unchanged,
            (Ensure::Present, Some(record)) => {
                let drift: Vec<Drift> = PermissionKind::ALL
                    .into_iter()
                    .filter_map(|kind| {
                        let desired = self.desired.get(kind)?;
                        (desired != record.get(kind)).then(|| Drift {
                            kind,
                            current: record.get(kind).to_string(),
                            desired: desired.to_string(),
                        })
                    })
                    .collect();

                if drift.is_empty() {
                    Change::Unchanged
                } else {
                    Change::Update { drift }
                }
            }
        };

        Ok(change)
    }

    /// Apply a planned change. Runs at most one rabbitmqctl command.
    pub fn apply(&mut self, session: &mut Session, change: &Change) -> Result<()> {
        match change {
            Change::Unchanged => Ok(()),
            Change::Create => self.create(session),
            Change::Destroy => self.destroy(session),
            Change::Update { drift } => {
                for d in drift {
                    self.set(d.kind, d.desired.clone());
                }
                self.flush(session)?;
                Ok(())
            }
        }
    }

    fn set_permissions(&self, session: &Session, values: &[String; 3]) -> Result<()> {
        let invocation = Invocation::set_permissions(
            &self.desired.vhost,
            &self.desired.user,
            [values[0].as_str(), values[1].as_str(), values[2].as_str()],
        );
        session.run(&invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::error::Error;
    use std::sync::Arc;

    fn setup(listing: &str) -> (Session, Arc<MockBackend>, PermissionProvider) {
        let mock = Arc::new(MockBackend::new().with_listing("foo", listing));
        let session = Session::new(Box::new(Arc::clone(&mock)));
        let provider = PermissionProvider::new(DesiredPermission::from_name("foo@bar").unwrap());
        (session, mock, provider)
    }

    #[test]
    fn test_exists_matches_listing() {
        let (mut session, _mock, provider) = setup("bar 1 2 3\n");
        assert_eq!(
            provider.exists(&mut session).unwrap(),
            Some(PermissionRecord::new("bar", "1", "2", "3"))
        );
    }

    #[test]
    fn test_exists_with_empty_columns() {
        let (mut session, _mock, provider) = setup("bar\t\t\t3\n");
        assert_eq!(
            provider.exists(&mut session).unwrap(),
            Some(PermissionRecord::new("bar", "", "", "3"))
        );
    }

    #[test]
    fn test_exists_rejects_extra_columns() {
        let (mut session, _mock, provider) = setup("bar 1 2 3 4\n");
        let err = provider.exists(&mut session).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(
            err.to_string()
                .contains("cannot parse line from list_user_permissions")
        );
    }

    #[test]
    fn test_exists_empty_listing() {
        let (mut session, _mock, provider) = setup("");
        assert_eq!(provider.exists(&mut session).unwrap(), None);
    }

    #[test]
    fn test_create_default_permissions() {
        let (mut session, mock, mut provider) = setup("");
        provider.create(&mut session).unwrap();
        assert_eq!(mock.commands(), vec!["set_permissions -p bar foo '' '' ''"]);
        assert_eq!(mock.list_count(), 0);
    }

    #[test]
    fn test_create_declared_permissions() {
        let (mut session, mock, _) = setup("");
        let mut provider = PermissionProvider::new(
            DesiredPermission::new("foo", "bar")
                .with(PermissionKind::Configure, ".*")
                .with(PermissionKind::Read, "^q\\..*"),
        );
        provider.create(&mut session).unwrap();
        assert_eq!(
            mock.invocations()[0].args,
            vec!["-p", "bar", "foo", ".*", "", "^q\\..*"]
        );
    }

    #[test]
    fn test_destroy_permissions() {
        let (mut session, mock, mut provider) = setup("");
        provider.destroy(&mut session).unwrap();
        assert_eq!(mock.commands(), vec!["clear_permissions -p bar foo"]);
    }

    #[test]
    fn test_getters_standalone() {
        for (kind, expected) in [
            (PermissionKind::Configure, "1"),
            (PermissionKind::Write, "2"),
            (PermissionKind::Read, "3"),
        ] {
            let (mut session, mock, provider) = setup("bar 1 2 3\n");
            assert_eq!(
                provider.get(&mut session, kind).unwrap().as_deref(),
                Some(expected)
            );
            assert_eq!(mock.list_count(), 1);
        }
    }

    #[test]
    fn test_getters_after_exists() {
        for (kind, expected) in [
            (PermissionKind::Configure, "1"),
            (PermissionKind::Write, "2"),
            (PermissionKind::Read, "3"),
        ] {
            let (mut session, mock, provider) = setup("bar 1 2 3\n");
            provider.exists(&mut session).unwrap();
            assert_eq!(
                provider.get(&mut session, kind).unwrap().as_deref(),
                Some(expected)
            );
            assert_eq!(mock.list_count(), 1);
        }
    }

    #[test]
    fn test_getter_without_record() {
        let (mut session, _mock, provider) = setup("");
        assert_eq!(provider.get(&mut session, PermissionKind::Read).unwrap(), None);
    }

    #[test]
    fn test_sync_each_permission() {
        for (kind, expected) in [
            (PermissionKind::Configure, ["foo", "2", "3"]),
            (PermissionKind::Read, ["1", "2", "foo"]),
            (PermissionKind::Write, ["1", "foo", "3"]),
        ] {
            let (mut session, mock, mut provider) = setup("bar 1 2 3\n");
            provider.set(kind, "foo");
            assert!(provider.flush(&mut session).unwrap());

            let invocations = mock.invocations();
            assert_eq!(invocations.len(), 1);
            assert_eq!(invocations[0].subcommand, "set_permissions");
            assert_eq!(invocations[0].args[..3], ["-p", "bar", "foo"]);
            assert_eq!(invocations[0].args[3..], expected);
        }
    }

    #[test]
    fn test_set_permissions_only_once() {
        let (mut session, mock, mut provider) = setup("bar 1 2 3\n");
        provider.set(PermissionKind::Configure, "foo");
        provider.set(PermissionKind::Read, "foo");
        assert_eq!(
            provider.pending().kinds(),
            vec![PermissionKind::Configure, PermissionKind::Read]
        );

        provider.flush(&mut session).unwrap();
        provider.flush(&mut session).unwrap();

        assert_eq!(mock.commands(), vec!["set_permissions -p bar foo foo 2 foo"]);
        assert!(provider.pending().is_empty());
    }

    #[test]
    fn test_flush_without_changes_is_noop() {
        let (mut session, mock, mut provider) = setup("bar 1 2 3\n");
        assert!(!provider.flush(&mut session).unwrap());
        assert!(mock.invocations().is_empty());
        assert_eq!(mock.list_count(), 0);
    }

    #[test]
    fn test_flush_blank_current_column_is_quoted() {
        let (mut session, mock, mut provider) = setup("bar\t\t\t3\n");
        provider.set(PermissionKind::Read, ".*");
        provider.flush(&mut session).unwrap();
        assert_eq!(mock.commands(), vec!["set_permissions -p bar foo '' '' .*"]);
    }

    #[test]
    fn test_setter_updates_declaration() {
        let (_session, _mock, mut provider) = setup("");
        provider.set(PermissionKind::Write, "x");
        assert_eq!(provider.desired().get(PermissionKind::Write), Some("x"));
    }

    #[test]
    fn test_plan_present() {
        let (mut session, _mock, _) = setup("bar 1 2 3\n");
        let provider = PermissionProvider::new(
            DesiredPermission::new("foo", "bar")
                .with(PermissionKind::Configure, "1")
                .with(PermissionKind::Read, "foo"),
        );

        let change = provider.plan(&mut session, Ensure::Present).unwrap();
        assert_eq!(
            change,
            Change::Update {
                drift: vec![Drift {
                    kind: PermissionKind::Read,
                    current: "3".to_string(),
                    desired: "foo".to_string(),
                }]
            }
        );
    }

    #[test]
    fn test_plan_undeclared_columns_are_ignored() {
        let (mut session, _mock, provider) = setup("bar 1 2 3\n");
        assert_eq!(
            provider.plan(&mut session, Ensure::Present).unwrap(),
            Change::Unchanged
        );
    }

    #[test]
    fn test_plan_create_and_destroy() {
        let (mut session, _mock, provider) = setup("");
        assert_eq!(provider.plan(&mut session, Ensure::Present).unwrap(), Change::Create);
        assert_eq!(provider.plan(&mut session, Ensure::Absent).unwrap(), Change::Unchanged);

        let (mut session, _mock, provider) = setup("bar 1 2 3\n");
        assert_eq!(provider.plan(&mut session, Ensure::Absent).unwrap(), Change::Destroy);
    }

    #[test]
    fn test_apply_update_coalesces() {
        let (mut session, mock, _) = setup("bar 1 2 3\n");
        let mut provider = PermissionProvider::new(
            DesiredPermission::new("foo", "bar")
                .with(PermissionKind::Configure, "foo")
                .with(PermissionKind::Write, "2")
                .with(PermissionKind::Read, "foo"),
        );

        let change = provider.plan(&mut session, Ensure::Present).unwrap();
        provider.apply(&mut session, &change).unwrap();

        assert_eq!(mock.commands(), vec!["set_permissions -p bar foo foo 2 foo"]);
        assert_eq!(mock.list_count(), 1);
    }

    #[test]
    fn test_command_failure_propagates() {
        let mock = Arc::new(MockBackend::new().failing_runs("Error: {no_such_user,<<\"foo\">>}"));
        let mut session = Session::new(Box::new(Arc::clone(&mock)));
        let mut provider = PermissionProvider::new(DesiredPermission::new("foo", "bar"));
        provider.set(PermissionKind::Read, ".*");

        let err = provider.flush(&mut session).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::NoSuchUser);
        assert_eq!(mock.invocations().len(), 1);
        assert!(!provider.pending().is_empty());
    }
}
