//! Permission resource - grant/update/clear a user's permissions on a vhost

use anyhow::{Context, Result};
use rabbitkit::{
    Change, DesiredPermission, Ensure, PermissionKind, PermissionProvider, PermissionRecord,
    Session,
};

use super::{ApplyContext, ApplyResult, Resource, ResourceState};
use crate::config::Declaration;
use crate::ui;

/// Declared permissions of one user on one vhost
#[derive(Debug, Clone)]
pub struct PermissionResource {
    provider: PermissionProvider,
    ensure: Ensure,
}

impl PermissionResource {
    pub fn new(desired: DesiredPermission, ensure: Ensure) -> Self {
        Self {
            provider: PermissionProvider::new(desired),
            ensure,
        }
    }

    pub fn from_declaration(declaration: Declaration) -> Self {
        Self::new(declaration.desired, declaration.ensure)
    }

    pub fn desired(&self) -> &DesiredPermission {
        self.provider.desired()
    }

    /// Actual permissions on the broker
    pub fn actual(&self, session: &mut Session) -> Result<Option<PermissionRecord>> {
        self.provider
            .exists(session)
            .with_context(|| format!("Failed to read permissions of {}", self.id()))
    }

    /// What applying this resource would do
    pub fn change(&self, session: &mut Session) -> Result<Change> {
        self.provider
            .plan(session, self.ensure)
            .with_context(|| format!("Failed to read permissions of {}", self.id()))
    }
}

/// "configure=.* write=(unmanaged) read=.*"
fn render_desired(desired: &DesiredPermission) -> String {
    PermissionKind::ALL
        .iter()
        .map(|k| format!("{k}={}", ui::declared(desired.get(*k))))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_record(record: &PermissionRecord) -> String {
    PermissionKind::ALL
        .iter()
        .map(|k| format!("{k}={}", ui::permission(record.get(*k))))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Resource for PermissionResource {
    fn id(&self) -> String {
        self.desired().name()
    }

    fn resource_type(&self) -> &'static str {
        "permission"
    }

    fn current_state(&self, session: &mut Session) -> Result<ResourceState> {
        let state = match self.change(session)? {
            Change::Unchanged => self.desired_state(),
            Change::Create => ResourceState::Absent,
            Change::Destroy => ResourceState::Present {
                details: self.actual(session)?.as_ref().map(render_record),
            },
            Change::Update { drift } => {
                let from = drift
                    .iter()
                    .map(|d| format!("{}={}", d.kind, ui::permission(&d.current)))
                    .collect::<Vec<_>>()
                    .join(" ");
                let to = drift
                    .iter()
                    .map(|d| format!("{}={}", d.kind, ui::permission(&d.desired)))
                    .collect::<Vec<_>>()
                    .join(" ");
                ResourceState::Modified { from, to }
            }
        };

        Ok(state)
    }

    fn desired_state(&self) -> ResourceState {
        match self.ensure {
            Ensure::Present => ResourceState::Present {
                details: Some(render_desired(self.desired())),
            },
            Ensure::Absent => ResourceState::Absent,
        }
    }

    fn apply(&mut self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let change = self.change(ctx.session)?;

        if !change.is_change() {
            return Ok(ApplyResult::NoChange);
        }

        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        self.provider
            .apply(ctx.session, &change)
            .with_context(|| format!("Failed to converge {}", self.id()))?;

        Ok(match change {
            Change::Create => ApplyResult::Created,
            Change::Destroy => ApplyResult::Removed,
            Change::Update { .. } | Change::Unchanged => ApplyResult::Modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rabbitkit::backend::mock::MockBackend;
    use std::sync::Arc;

    fn session_with(listing: &str) -> (Session, Arc<MockBackend>) {
        let mock = Arc::new(MockBackend::new().with_listing("app", listing));
        (Session::new(Box::new(Arc::clone(&mock))), mock)
    }

    fn resource(ensure: Ensure) -> PermissionResource {
        PermissionResource::new(
            DesiredPermission::new("app", "/")
                .with(PermissionKind::Configure, ".*")
                .with(PermissionKind::Read, ".*"),
            ensure,
        )
    }

    #[test]
    fn test_id_and_desired_state() {
        let r = resource(Ensure::Present);
        assert_eq!(r.id(), "app@/");
        assert_eq!(r.resource_type(), "permission");
        assert_eq!(
            r.desired_state(),
            ResourceState::Present {
                details: Some("configure=.* write=(unmanaged) read=.*".to_string())
            }
        );
        assert_eq!(resource(Ensure::Absent).desired_state(), ResourceState::Absent);
    }

    #[test]
    fn test_in_sync() {
        let (mut session, _mock) = session_with("/ .* x .*\n");
        let r = resource(Ensure::Present);
        assert_eq!(r.current_state(&mut session).unwrap(), r.desired_state());
        assert!(!r.change(&mut session).unwrap().is_change());
    }

    #[test]
    fn test_missing_is_absent() {
        let (mut session, _mock) = session_with("");
        let r = resource(Ensure::Present);
        assert_eq!(r.current_state(&mut session).unwrap(), ResourceState::Absent);
        assert_eq!(r.change(&mut session).unwrap(), Change::Create);
    }

    #[test]
    fn test_drift_is_modified() {
        let (mut session, _mock) = session_with("/\t\t\t.*\n");
        let r = resource(Ensure::Present);
        assert_eq!(
            r.current_state(&mut session).unwrap(),
            ResourceState::Modified {
                from: "configure=(none)".to_string(),
                to: "configure=.*".to_string(),
            }
        );
    }

    #[test]
    fn test_absent_but_present() {
        let (mut session, _mock) = session_with("/ .* .* .*\n");
        let r = resource(Ensure::Absent);
        assert_eq!(
            r.current_state(&mut session).unwrap(),
            ResourceState::Present {
                details: Some("configure=.* write=.* read=.*".to_string())
            }
        );
    }

    #[test]
    fn test_apply_update() {
        let (mut session, mock) = session_with("/ x y z\n");
        let mut r = resource(Ensure::Present);
        let mut ctx = ApplyContext {
            dry_run: false,
            session: &mut session,
        };
        assert_eq!(r.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(mock.commands(), vec!["set_permissions -p / app .* y .*"]);
    }

    #[test]
    fn test_apply_create_and_remove() {
        let (mut session, mock) = session_with("");
        let mut r = resource(Ensure::Present);
        let mut ctx = ApplyContext {
            dry_run: false,
            session: &mut session,
        };
        assert_eq!(r.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert_eq!(mock.commands(), vec!["set_permissions -p / app .* '' .*"]);

        let (mut session, mock) = session_with("/ .* .* .*\n");
        let mut r = resource(Ensure::Absent);
        let mut ctx = ApplyContext {
            dry_run: false,
            session: &mut session,
        };
        assert_eq!(r.apply(&mut ctx).unwrap(), ApplyResult::Removed);
        assert_eq!(mock.commands(), vec!["clear_permissions -p / app"]);
    }

    #[test]
    fn test_apply_dry_run() {
        let (mut session, mock) = session_with("");
        let mut r = resource(Ensure::Present);
        let mut ctx = ApplyContext {
            dry_run: true,
            session: &mut session,
        };
        assert!(matches!(
            r.apply(&mut ctx).unwrap(),
            ApplyResult::Skipped { .. }
        ));
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn test_apply_no_change() {
        let (mut session, mock) = session_with("/ .* .* .*\n");
        let mut r = resource(Ensure::Present);
        let mut ctx = ApplyContext {
            dry_run: false,
            session: &mut session,
        };
        assert_eq!(r.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn test_parse_error_has_context() {
        let (mut session, _mock) = session_with("/ 1 2 3 4\n");
        let err = resource(Ensure::Present)
            .current_state(&mut session)
            .unwrap_err();
        assert!(err.to_string().contains("app@/"));
        assert!(
            format!("{err:#}").contains("cannot parse line from list_user_permissions")
        );
    }
}
