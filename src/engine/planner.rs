//! Execution planner

use crate::config::Declaration;
use crate::resource::{PermissionResource, Resource};

/// Resources to converge, in declaration order
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub resources: Vec<Box<dyn Resource>>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_declarations(declarations: Vec<Declaration>) -> Self {
        let mut plan = Self::new();
        for declaration in declarations {
            plan.add_resource(Box::new(PermissionResource::from_declaration(declaration)));
        }
        plan
    }

    pub fn add_resource(&mut self, resource: Box<dyn Resource>) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Keep only resources matching `target`
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        let Some(target) = target else {
            return self;
        };

        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| matches_target(r.as_ref(), target))
                .collect(),
        }
    }
}

/// `user@vhost` matches exactly, a bare `user` matches all of its vhosts
pub fn matches_target(resource: &dyn Resource, target: &str) -> bool {
    let id = resource.id();
    if target.contains('@') {
        return id == target;
    }

    id.rsplit_once('@').is_some_and(|(user, _)| user == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rabbitkit::{DesiredPermission, Ensure};

    fn declaration(user: &str, vhost: &str) -> Declaration {
        Declaration {
            desired: DesiredPermission::new(user, vhost),
            ensure: Ensure::Present,
        }
    }

    fn plan() -> ExecutionPlan {
        ExecutionPlan::from_declarations(vec![
            declaration("app", "/"),
            declaration("app", "staging"),
            declaration("monitor", "/"),
        ])
    }

    fn ids(plan: &ExecutionPlan) -> Vec<String> {
        plan.resources.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_from_declarations_keeps_order() {
        assert_eq!(ids(&plan()), vec!["app@/", "app@staging", "monitor@/"]);
    }

    #[test]
    fn test_filter_by_user() {
        let filtered = plan().filter_by_target(Some("app"));
        assert_eq!(ids(&filtered), vec!["app@/", "app@staging"]);
    }

    #[test]
    fn test_filter_by_name() {
        let filtered = plan().filter_by_target(Some("monitor@/"));
        assert_eq!(ids(&filtered), vec!["monitor@/"]);
    }

    #[test]
    fn test_filter_no_match() {
        assert!(plan().filter_by_target(Some("ap")).is_empty());
        assert_eq!(plan().filter_by_target(None).len(), 3);
    }
}
