//! Core types for RabbitMQ permission management.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How an empty permission is rendered in a displayed command.
pub const EMPTY_TOKEN: &str = "''";

/// One of the three permission columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    /// Declare/delete resources
    Configure,
    /// Publish to exchanges
    Write,
    /// Consume from queues
    Read,
}

impl PermissionKind {
    /// All kinds, in rabbitmqctl column order.
    pub const ALL: [PermissionKind; 3] = [
        PermissionKind::Configure,
        PermissionKind::Write,
        PermissionKind::Read,
    ];

    /// Column index in rabbitmqctl argument order.
    pub fn index(&self) -> usize {
        match self {
            PermissionKind::Configure => 0,
            PermissionKind::Write => 1,
            PermissionKind::Read => 2,
        }
    }

    /// Attribute name in declarations.
    pub fn name(&self) -> &'static str {
        match self {
            PermissionKind::Configure => "configure",
            PermissionKind::Write => "write",
            PermissionKind::Read => "read",
        }
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PermissionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "configure" | "configure_permission" => Ok(PermissionKind::Configure),
            "write" | "write_permission" => Ok(PermissionKind::Write),
            "read" | "read_permission" => Ok(PermissionKind::Read),
            other => Err(format!("unknown permission kind: {other}")),
        }
    }
}

/// Whether a declared permission should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Permissions are granted
    #[default]
    Present,
    /// Permissions are cleared
    Absent,
}

impl std::fmt::Display for Ensure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ensure::Present => write!(f, "present"),
            Ensure::Absent => write!(f, "absent"),
        }
    }
}

/// Actual permissions of a user on one vhost, as listed by rabbitmqctl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Virtual host name
    pub vhost: String,
    /// Configure regex (may be empty)
    pub configure: String,
    /// Write regex (may be empty)
    pub write: String,
    /// Read regex (may be empty)
    pub read: String,
}

impl PermissionRecord {
    /// Create a record from its four listing columns.
    pub fn new(
        vhost: impl Into<String>,
        configure: impl Into<String>,
        write: impl Into<String>,
        read: impl Into<String>,
    ) -> Self {
        Self {
            vhost: vhost.into(),
            configure: configure.into(),
            write: write.into(),
            read: read.into(),
        }
    }

    /// Get one permission column.
    pub fn get(&self, kind: PermissionKind) -> &str {
        match kind {
            PermissionKind::Configure => &self.configure,
            PermissionKind::Write => &self.write,
            PermissionKind::Read => &self.read,
        }
    }
}

/// Permissions of one user, keyed by vhost.
pub type PermissionMap = HashMap<String, PermissionRecord>;

/// Declared permissions of a user on one vhost.
///
/// `None` means the permission was not declared; it is sent to
/// rabbitmqctl as an empty permission when the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DesiredPermission {
    /// Virtual host name
    pub vhost: String,
    /// User name
    pub user: String,
    /// Declared configure regex
    pub configure: Option<String>,
    /// Declared write regex
    pub write: Option<String>,
    /// Declared read regex
    pub read: Option<String>,
}

impl DesiredPermission {
    /// Create a declaration with no permissions set.
    pub fn new(user: impl Into<String>, vhost: impl Into<String>) -> Self {
        Self {
            vhost: vhost.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    /// Parse a `user@vhost` resource name.
    ///
    /// The split happens on the last `@`, so user names that are email
    /// addresses keep working.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.rsplit_once('@') {
            Some((user, vhost)) if !user.is_empty() && !vhost.is_empty() => {
                Ok(Self::new(user, vhost))
            }
            _ => Err(Error::InvalidName {
                name: name.to_string(),
            }),
        }
    }

    /// Resource name in `user@vhost` form.
    pub fn name(&self) -> String {
        format!("{}@{}", self.user, self.vhost)
    }

    /// Set one permission.
    pub fn with(mut self, kind: PermissionKind, value: impl Into<String>) -> Self {
        self.set(kind, value);
        self
    }

    /// Get one declared permission.
    pub fn get(&self, kind: PermissionKind) -> Option<&str> {
        match kind {
            PermissionKind::Configure => self.configure.as_deref(),
            PermissionKind::Write => self.write.as_deref(),
            PermissionKind::Read => self.read.as_deref(),
        }
    }

    /// Declare one permission.
    pub fn set(&mut self, kind: PermissionKind, value: impl Into<String>) {
        let slot = match kind {
            PermissionKind::Configure => &mut self.configure,
            PermissionKind::Write => &mut self.write,
            PermissionKind::Read => &mut self.read,
        };
        *slot = Some(value.into());
    }
}

/// Render an argument for display.
///
/// Empty values become [`EMPTY_TOKEN`] so a rendered command always shows
/// three permission arguments.
pub fn permission_token(value: &str) -> String {
    if value.is_empty() {
        EMPTY_TOKEN.to_string()
    } else {
        value.to_string()
    }
}

/// A mutating rabbitmqctl invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Subcommand (e.g. "set_permissions")
    pub subcommand: String,
    /// Arguments after the subcommand, verbatim; an empty string is an
    /// empty argument
    pub args: Vec<String>,
}

impl Invocation {
    /// `set_permissions -p <vhost> <user> <configure> <write> <read>`
    pub fn set_permissions(vhost: &str, user: &str, values: [&str; 3]) -> Self {
        let mut args = vec!["-p".to_string(), vhost.to_string(), user.to_string()];
        args.extend(values.iter().map(|v| (*v).to_string()));
        Self {
            subcommand: "set_permissions".to_string(),
            args,
        }
    }

    /// `clear_permissions -p <vhost> <user>`
    pub fn clear_permissions(vhost: &str, user: &str) -> Self {
        Self {
            subcommand: "clear_permissions".to_string(),
            args: vec!["-p".to_string(), vhost.to_string(), user.to_string()],
        }
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| permission_token(a)).collect();
        write!(f, "{} {}", self.subcommand, args.join(" "))
    }
}
